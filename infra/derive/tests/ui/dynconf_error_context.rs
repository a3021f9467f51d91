use dynconf_derive::dynconf_error;
use std::borrow::Cow;

#[dynconf_error]
pub enum SeedError {
    #[error("Parse error{}: {source}", format_context(.context))]
    Parse { source: std::num::ParseIntError, context: Option<Cow<'static, str>> },

    #[error("Missing key{}: {message}", format_context(.context))]
    Missing { message: Cow<'static, str>, context: Option<Cow<'static, str>> },
}

fn parse(raw: &str) -> Result<i64, SeedError> {
    raw.parse::<i64>().context("reading seed")
}

fn missing() -> Result<(), SeedError> {
    Err(SeedError::Missing { message: "degrade".into(), context: None })
}

fn main() {
    let err = parse("x").unwrap_err();
    assert!(err.to_string().starts_with("Parse error (reading seed): "));

    let converted: SeedError = "7x".parse::<i64>().unwrap_err().into();
    assert!(matches!(converted, SeedError::Parse { context: None, .. }));

    let err = missing().context("group:data_id").unwrap_err();
    assert_eq!(err.to_string(), "Missing key (group:data_id): degrade");
}
