//! Functions and their parameters

use serde::{Deserialize, Serialize};

use crate::annotations::{Annotations, impl_annotatable};
use crate::data_type::DataType;
use crate::ids::SchemaId;
use crate::names::{NamedItem, QualifiedName, impl_name_identity};

/// Direction of a parameter
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FunctionParameterMode {
    #[default]
    In,
    Out,
    InOut,
}

/// A function or function-import parameter
#[derive(Clone, Debug)]
pub struct FunctionParameter {
    pub name: String,
    pub data_type: DataType,
    pub mode: FunctionParameterMode,
    pub annotations: Annotations,
}

impl FunctionParameter {
    /// An `In` parameter
    pub fn new(name: impl Into<String>, data_type: DataType) -> Self {
        Self {
            name: name.into(),
            data_type,
            mode: FunctionParameterMode::In,
            annotations: Annotations::new(),
        }
    }

    #[must_use]
    pub const fn with_mode(mut self, mode: FunctionParameterMode) -> Self {
        self.mode = mode;
        self
    }
}

impl NamedItem for FunctionParameter {
    fn name(&self) -> &str {
        &self.name
    }
}

/// Schema-level function with an optional defining expression
#[derive(Clone, Debug)]
pub struct Function {
    name: QualifiedName,
    pub return_type: Option<DataType>,
    pub parameters: Vec<FunctionParameter>,
    pub defining_expression: Option<String>,
    pub(crate) model: Option<SchemaId>,
    pub annotations: Annotations,
}

impl Function {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: QualifiedName::new(name),
            return_type: None,
            parameters: Vec::new(),
            defining_expression: None,
            model: None,
            annotations: Annotations::new(),
        }
    }

    #[must_use]
    pub fn with_namespace(mut self, namespace: impl Into<String>) -> Self {
        self.name = self.name.in_namespace(namespace);
        self
    }

    #[must_use]
    pub fn returning(mut self, data_type: DataType) -> Self {
        self.return_type = Some(data_type);
        self
    }

    #[must_use]
    pub fn with_parameter(mut self, parameter: FunctionParameter) -> Self {
        self.parameters.push(parameter);
        self
    }

    #[must_use]
    pub fn with_defining_expression(mut self, expression: impl Into<String>) -> Self {
        self.defining_expression = Some(expression.into());
        self
    }

    /// Schema this function is registered in
    #[must_use]
    pub const fn model(&self) -> Option<SchemaId> {
        self.model
    }
}

impl NamedItem for Function {
    fn name(&self) -> &str {
        self.name.name()
    }

    fn namespace(&self) -> Option<&str> {
        self.name.namespace()
    }
}

impl_name_identity!(FunctionParameter, Function);
impl_annotatable!(FunctionParameter, Function);
