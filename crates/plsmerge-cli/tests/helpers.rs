#![allow(dead_code)]

use assert_cmd::Command;
use std::path::Path;

pub const HEAD: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<lexicon version="1.0"
      xmlns="http://www.w3.org/2005/01/pronunciation-lexicon"
      xmlns:xsi="http://www.w3.org/2001/XMLSchema-instance"
      xsi:schemaLocation="http://www.w3.org/2005/01/pronunciation-lexicon http://www.w3.org/TR/2007/CR-pronunciation-lexicon-20071212/pls.xsd"
      alphabet="ipa" xml:lang="en-US">"#;

/// Binary under test, run from `cwd` so that logs/ and plsmerge.toml stay
/// inside the temp dir.
pub fn bin_cmd(cwd: &Path) -> Command {
    let mut cmd = Command::cargo_bin("plsmerge").expect("plsmerge built");
    cmd.current_dir(cwd).env("NO_COLOR", "1");
    cmd
}

pub fn lexicon(entries: &[(&str, &str)]) -> String {
    let mut s = HEAD.to_string();
    for (g, p) in entries {
        s.push_str(&format!(
            "\n  <lexeme>\n    <grapheme>{g}</grapheme>\n    <phoneme>{p}</phoneme>\n  </lexeme>"
        ));
    }
    s.push_str("\n</lexicon>\n");
    s
}

pub fn write(dir: &Path, name: &str, content: &str) {
    std::fs::create_dir_all(dir).unwrap();
    std::fs::write(dir.join(name), content).unwrap();
}
