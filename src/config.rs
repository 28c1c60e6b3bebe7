use swiftcsv_core::{TokenizerBuilder, DEFAULT_MAX_ROW_SIZE};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// The default maximum size of a file accepted for parsing (32 GiB).
pub const DEFAULT_MAX_FILE_SIZE: u64 = 32 * (1 << 30);

/// The configuration of a parse.
///
/// Every option has a default, so the usual way to build one is with struct
/// update syntax:
///
/// ```
/// use swiftcsv::Config;
///
/// let config = Config { delimiter: b'\t', trim: true, ..Config::default() };
/// assert!(config.validate().is_ok());
/// ```
///
/// A configuration is validated once per operation, before any I/O happens,
/// and is then shared read-only by every worker of that operation.
#[derive(Clone, Debug, Eq, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct Config {
    /// The field delimiter. Defaults to `b','`.
    #[cfg_attr(feature = "serde", serde(with = "byte"))]
    pub delimiter: u8,
    /// The quote character. Defaults to `b'"'`.
    #[cfg_attr(feature = "serde", serde(with = "byte"))]
    pub quote: u8,
    /// An escape character that makes the following byte literal.
    #[cfg_attr(feature = "serde", serde(with = "opt_byte"))]
    pub escape: Option<u8>,
    /// A comment character. Lines starting with it are ignored.
    #[cfg_attr(feature = "serde", serde(with = "opt_byte"))]
    pub comment: Option<u8>,
    /// Strip ASCII whitespace around unquoted field contents.
    pub trim: bool,
    /// Suppress rows that consist of a single empty field.
    pub skip_empty_lines: bool,
    /// Recover from malformed input, collecting errors instead of failing.
    pub relaxed: bool,
    /// The maximum number of field bytes in a row. `0` means unbounded.
    pub max_row_size: usize,
    /// The first line (starting at `1`) whose rows are included.
    ///
    /// Each row is one line, even when a quoted field spans several
    /// physical lines. Comment lines are not counted.
    pub from_line: u64,
    /// The last line whose rows are included. `None` means unbounded.
    pub to_line: Option<u64>,
    /// Drop rows with errors instead of failing.
    pub skip_lines_with_error: bool,
    /// The maximum size of a file accepted for parsing.
    pub max_file_size: u64,
    /// Validate paths before opening them.
    ///
    /// Only disable this when the path is already known to refer to a
    /// regular file of acceptable size.
    pub validate_path: bool,
}

impl Default for Config {
    fn default() -> Config {
        Config {
            delimiter: b',',
            quote: b'"',
            escape: None,
            comment: None,
            trim: false,
            skip_empty_lines: false,
            relaxed: false,
            max_row_size: DEFAULT_MAX_ROW_SIZE,
            from_line: 1,
            to_line: None,
            skip_lines_with_error: false,
            max_file_size: DEFAULT_MAX_FILE_SIZE,
            validate_path: true,
        }
    }
}

impl Config {
    /// Check that this configuration describes a usable dialect.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let mut special =
            vec![("delimiter", self.delimiter), ("quote", self.quote)];
        if let Some(b) = self.escape {
            special.push(("escape", b));
        }
        if let Some(b) = self.comment {
            special.push(("comment", b));
        }
        for &(option, b) in &special {
            if b == b'\n' || b == b'\r' {
                return Err(ConfigError::LineTerminator { option: option });
            }
        }
        conflict("delimiter", Some(self.delimiter), "quote", self.quote)?;
        conflict("escape", self.escape, "delimiter", self.delimiter)?;
        conflict("comment", self.comment, "delimiter", self.delimiter)?;
        conflict("comment", self.comment, "quote", self.quote)?;
        if self.from_line == 0 {
            return Err(ConfigError::ZeroFromLine);
        }
        if let Some(to) = self.to_line {
            if to < self.from_line {
                return Err(ConfigError::InvertedLineRange {
                    from: self.from_line,
                    to: to,
                });
            }
        }
        Ok(())
    }

    /// Convert a string option (as given by a binding or a config file) to a
    /// single byte.
    ///
    /// `option` names the option in the error returned for empty or
    /// multi-byte values.
    pub fn single_byte(
        option: &'static str,
        value: &str,
    ) -> Result<u8, ConfigError> {
        match value.as_bytes() {
            &[b] => Ok(b),
            _ => Err(ConfigError::NotSingleByte {
                option: option,
                value: value.to_string(),
            }),
        }
    }

    /// Return a tokenizer builder for this dialect.
    pub fn tokenizer(&self) -> TokenizerBuilder {
        let mut builder = TokenizerBuilder::new();
        builder
            .delimiter(self.delimiter)
            .quote(self.quote)
            .escape(self.escape)
            .comment(self.comment)
            .trim(self.trim)
            .skip_empty_lines(self.skip_empty_lines)
            .relaxed(self.relaxed)
            .skip_lines_with_error(self.skip_lines_with_error)
            .max_row_size(self.max_row_size)
            .line_range(self.from_line, self.to_line);
        builder
    }
}

fn conflict(
    option: &'static str,
    byte: Option<u8>,
    other: &'static str,
    other_byte: u8,
) -> Result<(), ConfigError> {
    if byte == Some(other_byte) {
        return Err(ConfigError::Conflict {
            option: option,
            other: other,
            byte: other_byte,
        });
    }
    Ok(())
}

#[cfg(feature = "serde")]
mod byte {
    use serde::de::Error as _;
    use serde::{Deserialize, Deserializer, Serializer};

    use crate::config::Config;

    pub fn serialize<S: Serializer>(
        b: &u8,
        ser: S,
    ) -> Result<S::Ok, S::Error> {
        ser.serialize_char(*b as char)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(
        de: D,
    ) -> Result<u8, D::Error> {
        let s = String::deserialize(de)?;
        Config::single_byte("option", &s).map_err(D::Error::custom)
    }
}

#[cfg(feature = "serde")]
mod opt_byte {
    use serde::de::Error as _;
    use serde::{Deserialize, Deserializer, Serializer};

    use crate::config::Config;

    pub fn serialize<S: Serializer>(
        b: &Option<u8>,
        ser: S,
    ) -> Result<S::Ok, S::Error> {
        match *b {
            None => ser.serialize_none(),
            Some(b) => ser.serialize_some(&(b as char)),
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(
        de: D,
    ) -> Result<Option<u8>, D::Error> {
        match Option::<String>::deserialize(de)? {
            None => Ok(None),
            Some(s) => Config::single_byte("option", &s)
                .map(Some)
                .map_err(D::Error::custom),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::Config;
    use crate::error::ConfigError;

    #[test]
    fn default_is_valid() {
        assert_eq!(Config::default().validate(), Ok(()));
    }

    #[test]
    fn delimiter_equals_quote() {
        let config = Config { quote: b',', ..Config::default() };
        assert_eq!(
            config.validate(),
            Err(ConfigError::Conflict {
                option: "delimiter",
                other: "quote",
                byte: b',',
            })
        );
    }

    #[test]
    fn escape_equals_delimiter() {
        let config = Config { escape: Some(b','), ..Config::default() };
        assert_eq!(
            config.validate(),
            Err(ConfigError::Conflict {
                option: "escape",
                other: "delimiter",
                byte: b',',
            })
        );
    }

    #[test]
    fn escape_may_equal_quote() {
        let config = Config { escape: Some(b'"'), ..Config::default() };
        assert_eq!(config.validate(), Ok(()));
    }

    #[test]
    fn comment_equals_quote() {
        let config = Config { comment: Some(b'"'), ..Config::default() };
        assert!(config.validate().is_err());
    }

    #[test]
    fn line_terminator_rejected() {
        let config = Config { delimiter: b'\n', ..Config::default() };
        assert_eq!(
            config.validate(),
            Err(ConfigError::LineTerminator { option: "delimiter" })
        );
        let config = Config { comment: Some(b'\r'), ..Config::default() };
        assert_eq!(
            config.validate(),
            Err(ConfigError::LineTerminator { option: "comment" })
        );
    }

    #[test]
    fn line_range_rejected() {
        let config = Config { from_line: 0, ..Config::default() };
        assert_eq!(config.validate(), Err(ConfigError::ZeroFromLine));
        let config =
            Config { from_line: 5, to_line: Some(4), ..Config::default() };
        assert_eq!(
            config.validate(),
            Err(ConfigError::InvertedLineRange { from: 5, to: 4 })
        );
        let config =
            Config { from_line: 5, to_line: Some(5), ..Config::default() };
        assert_eq!(config.validate(), Ok(()));
    }

    #[test]
    fn single_byte() {
        assert_eq!(Config::single_byte("delimiter", ";"), Ok(b';'));
        assert!(Config::single_byte("delimiter", "").is_err());
        assert!(Config::single_byte("delimiter", ";;").is_err());
        assert!(Config::single_byte("delimiter", "é").is_err());
    }

    #[cfg(feature = "serde")]
    #[test]
    fn deserialize_partial() {
        let config: Config = serde_json::from_str(
            r#"{"delimiter": ";", "escape": "\\", "trim": true}"#,
        )
        .unwrap();
        assert_eq!(
            config,
            Config {
                delimiter: b';',
                escape: Some(b'\\'),
                trim: true,
                ..Config::default()
            }
        );
    }

    #[cfg(feature = "serde")]
    #[test]
    fn deserialize_rejects_multi_byte() {
        let res = serde_json::from_str::<Config>(r#"{"quote": "''"}"#);
        assert!(res.is_err());
        let res = serde_json::from_str::<Config>(r#"{"comment": ""}"#);
        assert!(res.is_err());
    }

    #[cfg(feature = "serde")]
    #[test]
    fn serialize_round_trips() {
        let config = Config { comment: Some(b'#'), ..Config::default() };
        let json = serde_json::to_string(&config).unwrap();
        assert_eq!(serde_json::from_str::<Config>(&json).unwrap(), config);
    }
}
