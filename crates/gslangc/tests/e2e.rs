use std::fs;
use std::path::Path;
use std::process::Command;

fn gslangc() -> Command {
    Command::new(env!("CARGO_BIN_EXE_gslangc"))
}

fn write_package(root: &Path, package: &str, files: &[(&str, &str)]) {
    let mut dir = root.join("src");
    for segment in package.split('.') {
        dir.push(segment);
    }
    fs::create_dir_all(&dir).unwrap();
    for (name, source) in files {
        fs::write(dir.join(name), source).unwrap();
    }
}

#[test]
fn compile_a_project() {
    let tmp = tempfile::tempdir().unwrap();
    write_package(
        tmp.path(),
        "demo",
        &[(
            "demo.gs",
            "package demo;\n\
             enum Color { Red, Green, Blue(5), Alpha }\n\
             table User { int32 id; string name; }\n\
             contract Api { User find(int32 id); }\n",
        )],
    );
    let ast_path = tmp.path().join("demo.json");

    let output = gslangc()
        .arg("compile")
        .arg("demo")
        .arg("--root")
        .arg(tmp.path())
        .arg("--emit-ast")
        .arg(&ast_path)
        .output()
        .unwrap();

    assert!(
        output.status.success(),
        "stderr: {}",
        String::from_utf8_lossy(&output.stderr)
    );

    let json = fs::read_to_string(&ast_path).unwrap();
    let value: serde_json::Value = serde_json::from_str(&json).unwrap();
    assert_eq!(value["name"], "demo");
}

#[test]
fn compile_reports_errors_and_fails() {
    let tmp = tempfile::tempdir().unwrap();
    write_package(
        tmp.path(),
        "demo",
        &[(
            "demo.gs",
            "package demo;\ntable T { Missing m; }\n",
        )],
    );

    let output = gslangc()
        .arg("compile")
        .arg("demo")
        .arg("--root")
        .arg(tmp.path())
        .output()
        .unwrap();

    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("error"), "stderr: {stderr}");
}

#[test]
fn missing_package_is_fatal() {
    let tmp = tempfile::tempdir().unwrap();
    let output = gslangc()
        .arg("compile")
        .arg("ghost")
        .arg("--root")
        .arg(tmp.path())
        .output()
        .unwrap();

    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("ghost"), "stderr: {stderr}");
}

#[test]
fn tokens_dump() {
    let tmp = tempfile::tempdir().unwrap();
    let file = tmp.path().join("numbers.gs");
    fs::write(&file, "12.5 125 0x100 hello").unwrap();

    let output = gslangc().arg("tokens").arg(&file).output().unwrap();
    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("12.5"));
    assert!(stdout.contains("256"), "hex literal is decoded: {stdout}");
    assert!(stdout.contains("hello"));
}
