use predicates::prelude::*;
use serde_json::Value;
use std::fs;

mod helpers;
use helpers::*;

#[test]
fn help_works() {
    let tmp = tempfile::tempdir().expect("tempdir");
    bin_cmd(tmp.path())
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("Merge and apply PLS pronunciation lexicons"));
}

#[test]
fn merge_writes_entries_in_file_name_order() {
    let tmp = tempfile::tempdir().expect("tempdir");
    let src = tmp.path().join("lexicons");
    write(&src, "b.pls", &lexicon(&[("dog", "d ao g")]));
    write(&src, "a.pls", &lexicon(&[("cat", "k ae t")]));
    let out = tmp.path().join("out").join("merge.pls");

    bin_cmd(tmp.path())
        .args(["merge", "--source-dir"])
        .arg(&src)
        .arg("--out")
        .arg(&out)
        .assert()
        .success()
        .stdout(predicate::str::contains("merged 2 entries from 2 files"));

    let xml = fs::read_to_string(&out).expect("output written");
    let cat = xml.find("<grapheme>cat</grapheme>").expect("cat entry");
    let dog = xml.find("<grapheme>dog</grapheme>").expect("dog entry");
    assert!(cat < dog);
    assert!(xml.starts_with(r#"<?xml version="1.0" encoding="UTF-8"?><lexicon xmlns="http://www.w3.org/2005/01/pronunciation-lexicon" xmlns:xsi="http://www.w3.org/2001/XMLSchema-instance""#));
    assert!(!xml.contains("ns0"));
}

#[test]
fn merge_uses_config_from_working_directory() {
    let tmp = tempfile::tempdir().expect("tempdir");
    write(&tmp.path().join("pls"), "a.pls", &lexicon(&[("cat", "k ae t")]));
    write(
        tmp.path(),
        "plsmerge.toml",
        "[merge]\nsource_dir = \"pls\"\noutput_path = \"merged/all.pls\"\nxml_declaration = false\n",
    );

    bin_cmd(tmp.path()).args(["--quiet", "merge"]).assert().success();

    let xml = fs::read_to_string(tmp.path().join("merged").join("all.pls")).expect("output");
    assert!(xml.starts_with("<lexicon "));
}

#[test]
fn merge_print_echoes_document() {
    let tmp = tempfile::tempdir().expect("tempdir");
    let src = tmp.path().join("lexicons");
    write(&src, "a.pls", &lexicon(&[("Y'shtola", "jiː ʃˈtoʊlə")]));

    bin_cmd(tmp.path())
        .args(["--quiet", "merge", "--print", "--dry-run"])
        .assert()
        .success()
        .stdout(predicate::str::contains("<phoneme>jiː ʃˈtoʊlə</phoneme>"))
        .stderr(predicate::str::contains("DRY-RUN"));

    assert!(!tmp.path().join("merge.pls").exists(), "dry run writes nothing");
}

#[test]
fn merge_fails_on_malformed_file_and_writes_nothing() {
    let tmp = tempfile::tempdir().expect("tempdir");
    let src = tmp.path().join("lexicons");
    write(&src, "a.pls", &lexicon(&[("cat", "k ae t")]));
    write(&src, "b.pls", "<lexicon><lexeme><grapheme>dog</lexeme>");
    let out = tmp.path().join("merge.pls");

    bin_cmd(tmp.path())
        .args(["--quiet", "merge", "--source-dir"])
        .arg(&src)
        .arg("--out")
        .arg(&out)
        .assert()
        .failure()
        .stderr(predicate::str::contains("b.pls"));

    assert!(!out.exists());
}

#[test]
fn merge_of_missing_directory_fails() {
    let tmp = tempfile::tempdir().expect("tempdir");
    bin_cmd(tmp.path())
        .args(["--quiet", "merge", "--source-dir", "nowhere"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("cannot list lexicon directory"));
}

#[test]
fn merge_of_empty_directory_warns_and_writes_nothing() {
    let tmp = tempfile::tempdir().expect("tempdir");
    let src = tmp.path().join("lexicons");
    fs::create_dir_all(&src).unwrap();

    bin_cmd(tmp.path())
        .args(["--quiet", "merge"])
        .assert()
        .success()
        .stderr(predicate::str::contains("no .pls files"));

    assert!(!tmp.path().join("merge.pls").exists());
}

#[test]
fn merge_namespace_flag_changes_prefix() {
    let tmp = tempfile::tempdir().expect("tempdir");
    write(&tmp.path().join("lexicons"), "a.pls", &lexicon(&[("cat", "k ae t")]));

    bin_cmd(tmp.path())
        .args([
            "--quiet",
            "merge",
            "--print",
            "--dry-run",
            "--namespace",
            "pls=http://www.w3.org/2005/01/pronunciation-lexicon",
        ])
        .assert()
        .success()
        .stdout(predicate::str::contains("<pls:lexeme><pls:grapheme>cat</pls:grapheme>"));
}

#[test]
fn scan_json_lists_lexemes() {
    let tmp = tempfile::tempdir().expect("tempdir");
    let src = tmp.path().join("lexicons");
    write(&src, "a.pls", &lexicon(&[("cat", "k ae t"), ("dog", "d ao g")]));

    let assert = bin_cmd(tmp.path())
        .args(["--quiet", "scan", "--format", "json"])
        .assert()
        .success();
    let stdout = String::from_utf8_lossy(assert.get_output().stdout.as_ref()).to_string();
    let v: Value = serde_json::from_str(&stdout).expect("valid json");
    let arr = v.as_array().expect("array");
    assert_eq!(arr.len(), 2);
    assert_eq!(arr[0]["schema_version"], 1);
    assert_eq!(arr[0]["graphemes"][0], "cat");
    assert_eq!(arr[1]["phoneme"], "d ao g");
}

#[test]
fn scan_csv_has_header() {
    let tmp = tempfile::tempdir().expect("tempdir");
    write(&tmp.path().join("lexicons"), "a.pls", &lexicon(&[("cat", "k ae t")]));

    bin_cmd(tmp.path())
        .args(["--quiet", "scan"])
        .assert()
        .success()
        .stdout(predicate::str::starts_with("grapheme,phoneme,alias,path"));
}

#[test]
fn ssml_applies_lexicon_directory() {
    let tmp = tempfile::tempdir().expect("tempdir");
    let src = tmp.path().join("lexicons");
    write(&src, "a.pls", &lexicon(&[("Y'shtola", "jiː ʃˈtoʊlə")]));

    bin_cmd(tmp.path())
        .args(["--quiet", "ssml", "--lexicon"])
        .arg(&src)
        .args(["--lang", "en-GB", "--text", "Hi Y'shtola"])
        .assert()
        .success()
        .stdout(predicate::str::contains(
            r#"xml:lang="en-GB">Hi <phoneme ph="jiːʃˈtoʊlə">Yshtola</phoneme></speak>"#,
        ));
}

#[test]
fn ssml_reads_text_from_stdin() {
    let tmp = tempfile::tempdir().expect("tempdir");
    let src = tmp.path().join("lexicons");
    write(&src, "a.pls", &lexicon(&[("cat", "k ae t")]));

    bin_cmd(tmp.path())
        .args(["--quiet", "ssml", "-x"])
        .arg(src.join("a.pls"))
        .write_stdin("a cat\n")
        .assert()
        .success()
        .stdout(predicate::str::contains(
            r#"xml:lang="en-US">a <phoneme ph="kaet">cat</phoneme></speak>"#,
        ));
}
