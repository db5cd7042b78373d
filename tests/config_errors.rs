// tests/config_errors.rs

use std::io::Write;
use std::time::Duration;

use procrun::config::{load_and_validate, load_from_path};
use procrun::errors::ProcrunError;
use procrun::exec::ExitValuePolicy;
use tempfile::NamedTempFile;

fn write_config(contents: &str) -> NamedTempFile {
    let mut file = NamedTempFile::new().unwrap();
    write!(file, "{contents}").unwrap();
    file
}

#[test]
fn valid_config_loads() {
    let file = write_config(
        r#"
[executor]
timeout = "2s"

[vars]
greeting = "hi"

[command.hello]
cmd = "echo ${greeting} 'to you'"
"#,
    );

    let cfg = load_and_validate(file.path()).unwrap();
    let hello = &cfg.command["hello"];
    assert_eq!(hello.command_line.program(), "echo");
    assert_eq!(hello.command_line.arguments(), &["${greeting}", "to you"]);
    assert_eq!(hello.timeout, Some(Duration::from_secs(2)));
    assert_eq!(hello.exit_policy, ExitValuePolicy::default());
    assert_eq!(cfg.command_names().collect::<Vec<_>>(), vec!["hello"]);
}

#[test]
fn config_without_commands_is_rejected() {
    let file = write_config("[executor]\ncheck_exit = true\n");

    match load_and_validate(file.path()) {
        Err(ProcrunError::ConfigError(msg)) => assert!(msg.contains("at least one")),
        Err(e) => panic!("Expected ConfigError, got: {:?}", e),
        Ok(_) => panic!("Expected error, got Ok"),
    }
}

#[test]
fn malformed_toml_is_a_toml_error() {
    let file = write_config("[command.a\ncmd = ");
    assert!(matches!(
        load_from_path(file.path()),
        Err(ProcrunError::TomlError(_))
    ));
}

#[test]
fn missing_file_is_an_io_error() {
    assert!(matches!(
        load_and_validate("/definitely/not/here/Procrun.toml"),
        Err(ProcrunError::IoError(_))
    ));
}

#[test]
fn invalid_timeout_names_the_field() {
    let file = write_config(
        r#"
[command.slow]
cmd = "sleep 1"
timeout = "soon"
"#,
    );

    match load_and_validate(file.path()) {
        Err(ProcrunError::ConfigError(msg)) => {
            assert!(msg.contains("[command.slow].timeout"));
        }
        other => panic!("Expected ConfigError, got: {:?}", other),
    }
}

#[test]
fn unbalanced_quote_in_cmd_is_rejected() {
    let file = write_config(
        r#"
[command.broken]
cmd = "echo 'oops"
"#,
    );

    match load_and_validate(file.path()) {
        Err(ProcrunError::ConfigError(msg)) => {
            assert!(msg.contains("[command.broken].cmd"));
            assert!(msg.contains("unbalanced quote"));
        }
        other => panic!("Expected ConfigError, got: {:?}", other),
    }
}
