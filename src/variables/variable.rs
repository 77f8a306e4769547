// src/variables/variable.rs

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::errors::ConfigError;

/// Leading marker of a reference value (`$name`).
pub const REFERENCE_MARKER: char = '$';
/// Escaped marker (`\$name`) denoting the literal string `$name`.
pub const ESCAPED_MARKER: &str = "\\$";

/// Static type of a variable or port.
///
/// Array-ness and file-ness are independent: every base kind (string, file,
/// remote file) comes in a scalar and an array form.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum VariableType {
    String,
    StringArray,
    File,
    FileArray,
    RemoteFile,
    RemoteFileArray,
}

impl VariableType {
    pub fn as_str(self) -> &'static str {
        match self {
            VariableType::String => "string",
            VariableType::StringArray => "string[]",
            VariableType::File => "file",
            VariableType::FileArray => "file[]",
            VariableType::RemoteFile => "remote-file",
            VariableType::RemoteFileArray => "remote-file[]",
        }
    }

    pub fn is_array(self) -> bool {
        matches!(
            self,
            VariableType::StringArray | VariableType::FileArray | VariableType::RemoteFileArray
        )
    }

    /// Local or remote file.
    pub fn is_file(self) -> bool {
        !matches!(self, VariableType::String | VariableType::StringArray)
    }

    pub fn is_remote(self) -> bool {
        matches!(self, VariableType::RemoteFile | VariableType::RemoteFileArray)
    }

    /// Whether a value of type `other` may be bound where `self` is expected.
    ///
    /// Remote files stand in for local files of the same array-ness; the
    /// data-in boxes fetch them before anything else sees them.
    pub fn is_compatible_with(self, other: VariableType) -> bool {
        self.is_array() == other.is_array() && self.is_file() == other.is_file()
    }
}

impl fmt::Display for VariableType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for VariableType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "string" => Ok(VariableType::String),
            "string[]" => Ok(VariableType::StringArray),
            "file" => Ok(VariableType::File),
            "file[]" => Ok(VariableType::FileArray),
            "remote-file" => Ok(VariableType::RemoteFile),
            "remote-file[]" => Ok(VariableType::RemoteFileArray),
            other => Err(format!("unknown variable type '{other}'")),
        }
    }
}

impl TryFrom<String> for VariableType {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<VariableType> for String {
    fn from(value: VariableType) -> Self {
        value.as_str().to_string()
    }
}

/// A literal value: one string or a sequence of strings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VariableValue {
    Scalar(String),
    Array(Vec<String>),
}

impl VariableValue {
    /// The empty value of the given type's shape.
    pub fn empty_for(ty: VariableType) -> Self {
        if ty.is_array() {
            VariableValue::Array(Vec::new())
        } else {
            VariableValue::Scalar(String::new())
        }
    }

    /// Build a value of the given type's shape from a list of elements.
    ///
    /// Scalars take the first element (or the empty string).
    pub fn from_elements(ty: VariableType, mut elements: Vec<String>) -> Self {
        if ty.is_array() {
            VariableValue::Array(elements)
        } else if elements.is_empty() {
            VariableValue::Scalar(String::new())
        } else {
            VariableValue::Scalar(elements.swap_remove(0))
        }
    }

    pub fn is_empty(&self) -> bool {
        match self {
            VariableValue::Scalar(s) => s.is_empty(),
            VariableValue::Array(items) => items.is_empty(),
        }
    }

    pub fn is_array(&self) -> bool {
        matches!(self, VariableValue::Array(_))
    }

    pub fn as_scalar(&self) -> Option<&str> {
        match self {
            VariableValue::Scalar(s) => Some(s),
            VariableValue::Array(_) => None,
        }
    }

    /// Elements of the value; an empty scalar has none.
    pub fn elements(&self) -> Vec<&str> {
        match self {
            VariableValue::Scalar(s) if s.is_empty() => Vec::new(),
            VariableValue::Scalar(s) => vec![s.as_str()],
            VariableValue::Array(items) => items.iter().map(String::as_str).collect(),
        }
    }

    fn map(&self, f: impl Fn(&str) -> String) -> VariableValue {
        match self {
            VariableValue::Scalar(s) => VariableValue::Scalar(f(s)),
            VariableValue::Array(items) => {
                VariableValue::Array(items.iter().map(|s| f(s)).collect())
            }
        }
    }
}

/// Parsed content of a variable: either a literal or an alias of another
/// variable.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VariableContent {
    Literal(VariableValue),
    Reference(String),
}

/// On-disk form of a scalar or sequence value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RawValue {
    Scalar(String),
    Array(Vec<String>),
}

impl Default for RawValue {
    fn default() -> Self {
        RawValue::Scalar(String::new())
    }
}

/// On-disk form of a variable, as found in pipeline and exercise files.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawVariable {
    pub name: String,
    #[serde(rename = "type")]
    pub ty: String,
    #[serde(default)]
    pub value: RawValue,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub directory: Option<String>,
}

/// A typed, named value flowing through box ports.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawVariable", into = "RawVariable")]
pub struct Variable {
    name: String,
    ty: VariableType,
    content: VariableContent,
    directory: Option<String>,
}

impl Variable {
    /// Literal variable. Fails if the value's shape does not match `ty`.
    pub fn new(
        name: impl Into<String>,
        ty: VariableType,
        value: VariableValue,
    ) -> Result<Self, ConfigError> {
        let name = name.into();
        check_shape(&name, ty, &value)?;
        Ok(Self {
            name,
            ty,
            content: VariableContent::Literal(value),
            directory: None,
        })
    }

    /// Variable aliasing `target`.
    pub fn reference(
        name: impl Into<String>,
        ty: VariableType,
        target: impl Into<String>,
    ) -> Result<Self, ConfigError> {
        let name = name.into();
        let target = target.into();
        if target.is_empty() {
            return Err(ConfigError::invalid_variable(&name, "empty reference"));
        }
        Ok(Self {
            name,
            ty,
            content: VariableContent::Reference(target),
            directory: None,
        })
    }

    /// Empty literal of the given type.
    pub fn empty(name: impl Into<String>, ty: VariableType) -> Self {
        Self {
            name: name.into(),
            ty,
            content: VariableContent::Literal(VariableValue::empty_for(ty)),
            directory: None,
        }
    }

    /// Parse a variable from its textual type and raw value.
    ///
    /// This is the only place where reference markers are interpreted.
    pub fn parse(
        name: impl Into<String>,
        ty: &str,
        value: RawValue,
    ) -> Result<Self, ConfigError> {
        let name = name.into();
        let ty: VariableType = ty
            .parse()
            .map_err(|e: String| ConfigError::invalid_variable(&name, e))?;

        let content = match value {
            RawValue::Scalar(s) => {
                if let Some(rest) = s.strip_prefix(ESCAPED_MARKER) {
                    scalar_literal(&name, ty, format!("{REFERENCE_MARKER}{rest}"))?
                } else if let Some(target) = s.strip_prefix(REFERENCE_MARKER) {
                    if target.is_empty() {
                        return Err(ConfigError::invalid_variable(&name, "empty reference"));
                    }
                    VariableContent::Reference(target.to_string())
                } else {
                    scalar_literal(&name, ty, s)?
                }
            }
            RawValue::Array(items) => {
                if !ty.is_array() {
                    return Err(ConfigError::invalid_variable(
                        &name,
                        format!("type '{ty}' expects a single value, got a sequence"),
                    ));
                }
                VariableContent::Literal(VariableValue::Array(
                    items.into_iter().map(unescape).collect(),
                ))
            }
        };

        Ok(Self {
            name,
            ty,
            content,
            directory: None,
        })
    }

    pub fn with_directory(mut self, directory: impl Into<String>) -> Self {
        let directory = directory.into();
        self.directory = if directory.is_empty() {
            None
        } else {
            Some(directory)
        };
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn ty(&self) -> VariableType {
        self.ty
    }

    pub fn content(&self) -> &VariableContent {
        &self.content
    }

    pub fn directory(&self) -> Option<&str> {
        self.directory.as_deref()
    }

    pub fn is_reference(&self) -> bool {
        matches!(self.content, VariableContent::Reference(_))
    }

    /// Name of the referenced variable, without the marker.
    pub fn reference_target(&self) -> Option<&str> {
        match &self.content {
            VariableContent::Reference(target) => Some(target),
            VariableContent::Literal(_) => None,
        }
    }

    pub fn literal(&self) -> Option<&VariableValue> {
        match &self.content {
            VariableContent::Literal(value) => Some(value),
            VariableContent::Reference(_) => None,
        }
    }

    /// True for an empty literal. References are never empty.
    pub fn is_empty(&self) -> bool {
        self.literal().is_some_and(VariableValue::is_empty)
    }

    /// Value with `prefix` prepended to every element.
    ///
    /// File variables with a `directory` are addressed inside it. A
    /// reference yields its bare target name and is never prefixed.
    pub fn value(&self, prefix: &str) -> VariableValue {
        match &self.content {
            VariableContent::Reference(target) => VariableValue::Scalar(target.clone()),
            VariableContent::Literal(value) => {
                value.map(|element| format!("{prefix}{}", self.addressed(element)))
            }
        }
    }

    /// `element` as addressed through this variable's `directory`.
    pub fn addressed(&self, element: &str) -> String {
        match &self.directory {
            Some(dir) if self.ty.is_file() => format!("{}/{element}", dir.trim_end_matches('/')),
            _ => element.to_string(),
        }
    }

    /// Replace the content with a literal value of matching shape.
    pub fn set_value(&mut self, value: VariableValue) -> Result<(), ConfigError> {
        check_shape(&self.name, self.ty, &value)?;
        self.content = VariableContent::Literal(value);
        Ok(())
    }

    /// Copy of this variable under another name.
    pub fn renamed(&self, name: &str) -> Variable {
        Variable {
            name: name.to_string(),
            ..self.clone()
        }
    }
}

fn check_shape(name: &str, ty: VariableType, value: &VariableValue) -> Result<(), ConfigError> {
    if ty.is_array() != value.is_array() {
        let expected = if ty.is_array() { "a sequence" } else { "a single value" };
        return Err(ConfigError::invalid_variable(
            name,
            format!("type '{ty}' expects {expected}"),
        ));
    }
    Ok(())
}

fn scalar_literal(
    name: &str,
    ty: VariableType,
    value: String,
) -> Result<VariableContent, ConfigError> {
    if !ty.is_array() {
        return Ok(VariableContent::Literal(VariableValue::Scalar(value)));
    }
    if value.is_empty() {
        return Ok(VariableContent::Literal(VariableValue::Array(Vec::new())));
    }
    Err(ConfigError::invalid_variable(
        name,
        format!("type '{ty}' expects a sequence, got '{value}'"),
    ))
}

fn unescape(element: String) -> String {
    match element.strip_prefix(ESCAPED_MARKER) {
        Some(rest) => format!("{REFERENCE_MARKER}{rest}"),
        None => element,
    }
}

fn escape(element: &str) -> String {
    if element.starts_with(REFERENCE_MARKER) {
        format!("\\{element}")
    } else {
        element.to_string()
    }
}

impl TryFrom<RawVariable> for Variable {
    type Error = ConfigError;

    fn try_from(raw: RawVariable) -> Result<Self, Self::Error> {
        let variable = Variable::parse(raw.name, &raw.ty, raw.value)?;
        Ok(match raw.directory {
            Some(dir) => variable.with_directory(dir),
            None => variable,
        })
    }
}

impl From<Variable> for RawVariable {
    fn from(variable: Variable) -> Self {
        let value = match &variable.content {
            VariableContent::Reference(target) => {
                RawValue::Scalar(format!("{REFERENCE_MARKER}{target}"))
            }
            VariableContent::Literal(VariableValue::Scalar(s)) => RawValue::Scalar(escape(s)),
            VariableContent::Literal(VariableValue::Array(items)) => {
                RawValue::Array(items.iter().map(|s| escape(s)).collect())
            }
        };
        RawVariable {
            name: variable.name,
            ty: variable.ty.as_str().to_string(),
            value,
            directory: variable.directory,
        }
    }
}
