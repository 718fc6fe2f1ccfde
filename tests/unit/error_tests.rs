//! Unit tests for the error taxonomy.

use redteam_console::AppError;

#[test]
fn display_prefixes_identify_the_failure_class() {
    let cases = [
        (AppError::Validation("empty target".into()), "validation:"),
        (AppError::SessionCreate("503".into()), "session create:"),
        (AppError::RunStart("500".into()), "run start:"),
        (AppError::Stream("reset by peer".into()), "stream:"),
        (AppError::ActionTimeout("5s".into()), "action timeout:"),
        (AppError::ActionCancelled("stopped".into()), "action cancelled:"),
        (AppError::Http("404".into()), "http:"),
        (AppError::Config("bad toml".into()), "config:"),
        (AppError::Io("broken pipe".into()), "io:"),
    ];

    for (err, prefix) in cases {
        let rendered = err.to_string();
        assert!(
            rendered.starts_with(prefix),
            "expected {rendered:?} to start with {prefix:?}"
        );
    }
}

#[test]
fn io_errors_convert_for_the_codec_contract() {
    let io = std::io::Error::other("underlying transport failure");
    let err: AppError = io.into();
    assert!(matches!(err, AppError::Io(_)));
    assert!(err.to_string().contains("transport failure"));
}

#[test]
fn toml_errors_convert_to_config() {
    let toml_err = toml::from_str::<toml::Value>("= nonsense").unwrap_err();
    let err: AppError = toml_err.into();
    assert!(matches!(err, AppError::Config(_)));
}
