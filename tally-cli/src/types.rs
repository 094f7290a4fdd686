//! Common types used across CLI modules

use std::str::FromStr;

use tally_core::domain::descriptor::OptionValue;

/// A `name=value` launch option given on the command line
#[derive(Debug, Clone, PartialEq)]
pub struct OptionArg {
    pub name: String,
    pub value: OptionValue,
}

impl FromStr for OptionArg {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (name, raw) = s
            .split_once('=')
            .ok_or_else(|| format!("expected name=value, got '{}'", s))?;

        let name = name.trim();
        if name.is_empty() {
            return Err(format!("missing option name in '{}'", s));
        }

        Ok(Self {
            name: name.to_string(),
            value: OptionValue::parse(raw.trim()),
        })
    }
}
