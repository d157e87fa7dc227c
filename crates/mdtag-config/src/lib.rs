//! Configuration management for mdtag.
//!
//! Parses `mdtag.toml` configuration files with serde and provides
//! auto-discovery of config files in parent directories.
//!
//! Caller overrides can be applied during load via [`Settings`].
//!
//! ```toml
//! [parser]
//! dialect = "github"
//! extensions = ["wiki_links", "latex_math_spans"]
//! charset = "utf-8"
//!
//! [terminal]
//! styles = "auto"
//! width = 80
//! list_marks = "dash"
//! headings = "uniform"
//! rule_char = "-"
//! ```

use serde::Deserialize;
use std::path::{Path, PathBuf};

/// Settings that override configuration file values.
///
/// All fields are optional. Only non-None values override the loaded config.
#[derive(Debug, Default)]
pub struct Settings {
    /// Override the markdown dialect.
    pub dialect: Option<Dialect>,
    /// Extra extensions, added on top of the configured ones.
    pub extensions: Vec<Extension>,
    /// Override the text charset.
    pub charset: Option<Charset>,
    /// Override the terminal style set.
    pub styles: Option<StyleChoice>,
    /// Override the terminal width.
    pub width: Option<usize>,
}

/// Configuration filename to search for.
const CONFIG_FILENAME: &str = "mdtag.toml";

/// Widest terminal a config file may request.
const MAX_WIDTH: usize = 1000;

/// Application configuration.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Parser (event source) configuration.
    pub parser: ParserConfig,
    /// Terminal renderer configuration.
    pub terminal: TerminalConfig,

    /// Path to the config file (set after loading).
    #[serde(skip)]
    pub config_path: Option<PathBuf>,
}

/// Named bundle of markdown extensions.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Dialect {
    /// Plain `CommonMark`, no extensions.
    #[default]
    CommonMark,
    /// GitHub flavour: autolinks, tables, strikethrough and task lists.
    Github,
}

/// A single optional parser behaviour.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Extension {
    CollapseWhitespace,
    PermissiveAtxHeaders,
    PermissiveUrlAutolinks,
    PermissiveEmailAutolinks,
    PermissiveWwwAutolinks,
    PermissiveAutolinks,
    NoIndentedCodeBlocks,
    NoHtmlBlocks,
    NoHtmlSpans,
    NoHtml,
    Tables,
    #[serde(alias = "strike_through")]
    Strikethrough,
    TaskLists,
    LatexMathSpans,
    WikiLinks,
    Underline,
}

/// Character set used to decode text handed over by the parser.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
pub enum Charset {
    #[default]
    #[serde(rename = "utf-8", alias = "utf8", alias = "UTF-8")]
    Utf8,
    #[serde(rename = "ascii", alias = "us-ascii", alias = "ASCII")]
    Ascii,
    #[serde(rename = "latin-1", alias = "latin1", alias = "iso-8859-1")]
    Latin1,
}

impl Charset {
    /// Canonical charset label.
    #[must_use]
    pub fn label(self) -> &'static str {
        match self {
            Self::Utf8 => "utf-8",
            Self::Ascii => "ascii",
            Self::Latin1 => "latin-1",
        }
    }
}

/// Parser configuration.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct ParserConfig {
    /// Base dialect.
    pub dialect: Dialect,
    /// Extensions enabled on top of the dialect.
    pub extensions: Vec<Extension>,
    /// Charset for decoding text runs and attributes.
    pub charset: Charset,
}

/// Which terminal style set to use.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StyleChoice {
    /// ANSI styles when the terminal supports colors, plain otherwise.
    #[default]
    Auto,
    /// Always emit ANSI escape sequences.
    Ansi,
    /// Never emit escape sequences.
    Plain,
}

/// How list items are marked in terminal output.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ListMarks {
    /// Every item gets a dash, whatever the list type.
    #[default]
    Dash,
    /// Bullets use the source mark; ordered items use their number and delimiter.
    Source,
}

/// How headings are marked in terminal output.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HeadingMarks {
    /// `# Title #` for every level.
    #[default]
    Uniform,
    /// One `#` per heading level.
    Level,
}

/// Terminal renderer configuration.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct TerminalConfig {
    /// Style set.
    pub styles: StyleChoice,
    /// Fixed width for horizontal rules. Queried from the terminal when unset.
    pub width: Option<usize>,
    /// List item marker policy.
    pub list_marks: ListMarks,
    /// Heading marker policy.
    pub headings: HeadingMarks,
    /// Character repeated to draw horizontal rules.
    pub rule_char: char,
}

impl Default for TerminalConfig {
    fn default() -> Self {
        Self {
            styles: StyleChoice::default(),
            width: None,
            list_marks: ListMarks::default(),
            headings: HeadingMarks::default(),
            rule_char: '-',
        }
    }
}

/// Configuration error.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// File not found.
    #[error("Configuration file not found: {}", .0.display())]
    NotFound(PathBuf),
    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    /// TOML parsing error.
    #[error("TOML parse error: {0}")]
    Parse(#[from] toml::de::Error),
    /// Validation error.
    #[error("Configuration error: {0}")]
    Validation(String),
}

impl Config {
    /// Load configuration from file with optional override settings.
    ///
    /// If `config_path` is provided, loads from that file.
    /// Otherwise, searches for `mdtag.toml` in current directory and parents.
    ///
    /// Settings are applied after loading, so they take precedence over
    /// config file values.
    ///
    /// # Errors
    ///
    /// Returns error if explicit `config_path` doesn't exist or parsing fails.
    pub fn load(
        config_path: Option<&Path>,
        settings: Option<&Settings>,
    ) -> Result<Self, ConfigError> {
        let mut config = if let Some(path) = config_path {
            if !path.exists() {
                return Err(ConfigError::NotFound(path.to_path_buf()));
            }
            Self::load_from_file(path)?
        } else if let Some(discovered) = std::env::current_dir()
            .ok()
            .and_then(|cwd| Self::discover_from(&cwd))
        {
            Self::load_from_file(&discovered)?
        } else {
            Self::default()
        };

        if let Some(settings) = settings {
            config.apply_settings(settings);
            config.validate()?;
        }

        Ok(config)
    }

    /// Apply override settings to the configuration.
    fn apply_settings(&mut self, settings: &Settings) {
        if let Some(dialect) = settings.dialect {
            self.parser.dialect = dialect;
        }
        for extension in &settings.extensions {
            if !self.parser.extensions.contains(extension) {
                self.parser.extensions.push(*extension);
            }
        }
        if let Some(charset) = settings.charset {
            self.parser.charset = charset;
        }
        if let Some(styles) = settings.styles {
            self.terminal.styles = styles;
        }
        if let Some(width) = settings.width {
            self.terminal.width = Some(width);
        }
    }

    /// Search for a config file in `start` and its parents.
    #[must_use]
    pub fn discover_from(start: &Path) -> Option<PathBuf> {
        let mut current = start.to_path_buf();
        loop {
            let candidate = current.join(CONFIG_FILENAME);
            if candidate.exists() {
                return Some(candidate);
            }
            if !current.pop() {
                return None;
            }
        }
    }

    /// Load configuration from a specific file.
    fn load_from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        let mut config: Self = toml::from_str(&content)?;
        config.config_path = Some(path.to_path_buf());

        config.validate()?;

        Ok(config)
    }

    /// Validate configuration values.
    ///
    /// Called automatically after loading from file.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Validation` if any validation fails.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.validate_terminal()
    }

    /// Validate terminal configuration.
    fn validate_terminal(&self) -> Result<(), ConfigError> {
        if let Some(width) = self.terminal.width {
            if width == 0 {
                return Err(ConfigError::Validation(
                    "terminal.width must be greater than 0".to_owned(),
                ));
            }
            if width > MAX_WIDTH {
                return Err(ConfigError::Validation(format!(
                    "terminal.width cannot exceed {MAX_WIDTH}"
                )));
            }
        }

        let rule_char = self.terminal.rule_char;
        if rule_char.is_control() || rule_char.is_whitespace() {
            return Err(ConfigError::Validation(format!(
                "terminal.rule_char must be a visible character, got {rule_char:?}"
            )));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.parser.dialect, Dialect::CommonMark);
        assert!(config.parser.extensions.is_empty());
        assert_eq!(config.parser.charset, Charset::Utf8);
        assert_eq!(config.terminal.styles, StyleChoice::Auto);
        assert_eq!(config.terminal.width, None);
        assert_eq!(config.terminal.list_marks, ListMarks::Dash);
        assert_eq!(config.terminal.headings, HeadingMarks::Uniform);
        assert_eq!(config.terminal.rule_char, '-');
        assert!(config.config_path.is_none());
    }

    #[test]
    fn test_parse_minimal_config() {
        let config: Config = toml::from_str("").unwrap();
        assert_eq!(config.parser.dialect, Dialect::CommonMark);
        assert_eq!(config.terminal.rule_char, '-');
    }

    #[test]
    fn test_parse_parser_config() {
        let toml = r#"
[parser]
dialect = "github"
extensions = ["wiki_links", "strike_through", "no_html"]
charset = "latin1"
"#;
        let config: Config = toml::from_str(toml).unwrap();
        assert_eq!(config.parser.dialect, Dialect::Github);
        assert_eq!(
            config.parser.extensions,
            vec![
                Extension::WikiLinks,
                Extension::Strikethrough,
                Extension::NoHtml
            ]
        );
        assert_eq!(config.parser.charset, Charset::Latin1);
    }

    #[test]
    fn test_parse_terminal_config() {
        let toml = r#"
[terminal]
styles = "plain"
width = 72
list_marks = "source"
headings = "level"
rule_char = "="
"#;
        let config: Config = toml::from_str(toml).unwrap();
        assert_eq!(config.terminal.styles, StyleChoice::Plain);
        assert_eq!(config.terminal.width, Some(72));
        assert_eq!(config.terminal.list_marks, ListMarks::Source);
        assert_eq!(config.terminal.headings, HeadingMarks::Level);
        assert_eq!(config.terminal.rule_char, '=');
    }

    #[test]
    fn test_unknown_extension_is_parse_error() {
        let toml = r#"
[parser]
extensions = ["footnotes"]
"#;
        let result: Result<Config, _> = toml::from_str(toml);
        assert!(result.is_err());
    }

    #[test]
    fn test_unknown_charset_is_parse_error() {
        let toml = r#"
[parser]
charset = "ebcdic"
"#;
        let result: Result<Config, _> = toml::from_str(toml);
        assert!(result.is_err());
    }

    #[test]
    fn test_validate_zero_width() {
        let mut config = Config::default();
        config.terminal.width = Some(0);
        let err = config.validate().unwrap_err();
        assert!(
            matches!(err, ConfigError::Validation(_)),
            "Expected ConfigError::Validation, got {err:?}"
        );
        assert!(err.to_string().contains("terminal.width"));
    }

    #[test]
    fn test_validate_width_too_large() {
        let mut config = Config::default();
        config.terminal.width = Some(MAX_WIDTH + 1);
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_invisible_rule_char() {
        let mut config = Config::default();
        config.terminal.rule_char = ' ';
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("rule_char"));
    }

    #[test]
    fn test_apply_settings_dialect_and_charset() {
        let mut config = Config::default();
        let settings = Settings {
            dialect: Some(Dialect::Github),
            charset: Some(Charset::Ascii),
            ..Default::default()
        };

        config.apply_settings(&settings);

        assert_eq!(config.parser.dialect, Dialect::Github);
        assert_eq!(config.parser.charset, Charset::Ascii);
        assert_eq!(config.terminal.styles, StyleChoice::Auto); // Unchanged
    }

    #[test]
    fn test_apply_settings_extensions_deduplicated() {
        let mut config = Config::default();
        config.parser.extensions = vec![Extension::Tables];
        let settings = Settings {
            extensions: vec![Extension::Tables, Extension::Underline],
            ..Default::default()
        };

        config.apply_settings(&settings);

        assert_eq!(
            config.parser.extensions,
            vec![Extension::Tables, Extension::Underline]
        );
    }

    #[test]
    fn test_apply_settings_terminal() {
        let mut config = Config::default();
        let settings = Settings {
            styles: Some(StyleChoice::Ansi),
            width: Some(120),
            ..Default::default()
        };

        config.apply_settings(&settings);

        assert_eq!(config.terminal.styles, StyleChoice::Ansi);
        assert_eq!(config.terminal.width, Some(120));
    }

    #[test]
    fn test_load_explicit_path_not_found() {
        let result = Config::load(Some(Path::new("/nonexistent/mdtag.toml")), None);
        assert!(matches!(result, Err(ConfigError::NotFound(_))));
    }

    #[test]
    fn test_load_explicit_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(CONFIG_FILENAME);
        std::fs::write(&path, "[terminal]\nwidth = 40\n").unwrap();

        let config = Config::load(Some(&path), None).unwrap();

        assert_eq!(config.terminal.width, Some(40));
        assert_eq!(config.config_path, Some(path));
    }

    #[test]
    fn test_load_applies_settings_after_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(CONFIG_FILENAME);
        std::fs::write(&path, "[terminal]\nwidth = 40\n").unwrap();
        let settings = Settings {
            width: Some(100),
            ..Default::default()
        };

        let config = Config::load(Some(&path), Some(&settings)).unwrap();

        assert_eq!(config.terminal.width, Some(100));
    }

    #[test]
    fn test_load_rejects_invalid_settings() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(CONFIG_FILENAME);
        std::fs::write(&path, "").unwrap();
        let settings = Settings {
            width: Some(0),
            ..Default::default()
        };

        let result = Config::load(Some(&path), Some(&settings));

        assert!(matches!(result, Err(ConfigError::Validation(_))));
    }

    #[test]
    fn test_load_invalid_file_is_validation_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(CONFIG_FILENAME);
        std::fs::write(&path, "[terminal]\nwidth = 0\n").unwrap();

        let result = Config::load(Some(&path), None);

        assert!(matches!(result, Err(ConfigError::Validation(_))));
    }

    #[test]
    fn test_load_malformed_toml_is_parse_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(CONFIG_FILENAME);
        std::fs::write(&path, "[terminal\n").unwrap();

        let result = Config::load(Some(&path), None);

        assert!(matches!(result, Err(ConfigError::Parse(_))));
    }

    #[test]
    fn test_discover_from_parent_directory() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(CONFIG_FILENAME);
        std::fs::write(&path, "").unwrap();
        let nested = dir.path().join("docs").join("guide");
        std::fs::create_dir_all(&nested).unwrap();

        assert_eq!(Config::discover_from(&nested), Some(path));
    }

    #[test]
    fn test_discover_from_prefers_nearest() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join(CONFIG_FILENAME), "").unwrap();
        let nested = dir.path().join("docs");
        std::fs::create_dir_all(&nested).unwrap();
        let nearest = nested.join(CONFIG_FILENAME);
        std::fs::write(&nearest, "").unwrap();

        assert_eq!(Config::discover_from(&nested), Some(nearest));
    }

    #[test]
    fn test_charset_labels() {
        assert_eq!(Charset::Utf8.label(), "utf-8");
        assert_eq!(Charset::Ascii.label(), "ascii");
        assert_eq!(Charset::Latin1.label(), "latin-1");
    }
}
