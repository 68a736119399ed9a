/******************************************************************************
   Author: Joaquín Béjar García
   Email: jb@taunais.com
   Date: 27/1/26
******************************************************************************/

//! FAST templates.
//!
//! A [`Template`] is an ordered tree of [`Instruction`]s. Templates are
//! validated once, when they are added to a [`TemplateRegistry`], and shared
//! read-only afterwards.

use crate::error::FastError;
use crate::operators::{DictionaryScope, Operator};
use crate::value::{ScalarType, ScalarValue};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;

/// Static template references followed when counting presence bits.
const MAX_REFERENCE_DEPTH: usize = 16;

/// Scalar field instruction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScalarField {
    /// Field name.
    pub name: Arc<str>,
    /// FIX tag number, if declared.
    pub id: Option<u32>,
    /// Wire type.
    pub ty: ScalarType,
    /// Whether the field may be absent.
    pub optional: bool,
    /// Field operator.
    pub operator: Operator,
    /// Initial value for the operator.
    pub initial: Option<ScalarValue>,
    /// Dictionary scope.
    pub dictionary: DictionaryScope,
    /// Dictionary key; the field name when unset.
    pub key: Option<Arc<str>>,
}

impl ScalarField {
    /// Creates a mandatory field with no operator.
    #[must_use]
    pub fn new(name: impl Into<Arc<str>>, ty: ScalarType) -> Self {
        Self {
            name: name.into(),
            id: None,
            ty,
            optional: false,
            operator: Operator::None,
            initial: None,
            dictionary: DictionaryScope::default(),
            key: None,
        }
    }

    /// Marks the field optional.
    #[must_use]
    pub fn optional(mut self) -> Self {
        self.optional = true;
        self
    }

    /// Sets the FIX tag number.
    #[must_use]
    pub fn with_id(mut self, id: u32) -> Self {
        self.id = Some(id);
        self
    }

    /// Sets the operator.
    #[must_use]
    pub fn with_operator(mut self, operator: Operator) -> Self {
        self.operator = operator;
        self
    }

    /// Sets the initial value.
    #[must_use]
    pub fn with_initial(mut self, value: impl Into<ScalarValue>) -> Self {
        self.initial = Some(value.into());
        self
    }

    /// Sets the dictionary scope.
    #[must_use]
    pub fn with_dictionary(mut self, scope: DictionaryScope) -> Self {
        self.dictionary = scope;
        self
    }

    /// Sets an explicit dictionary key.
    #[must_use]
    pub fn with_key(mut self, key: impl Into<Arc<str>>) -> Self {
        self.key = Some(key.into());
        self
    }

    /// Returns the dictionary key.
    #[must_use]
    pub fn dictionary_key(&self) -> &Arc<str> {
        self.key.as_ref().unwrap_or(&self.name)
    }

    /// Returns the number of presence bits this field takes (0 or 1).
    #[must_use]
    pub const fn presence_bits(&self) -> usize {
        if self.operator.requires_pmap_bit(self.optional) {
            1
        } else {
            0
        }
    }

    fn validate(&self, template_id: u32) -> Result<(), FastError> {
        let reject = |reason: String| FastError::InvalidTemplate {
            template_id,
            reason: format!("field {}: {reason}", self.name),
        };

        if let Some(initial) = &self.initial {
            if !self.ty.accepts(initial) {
                return Err(reject(format!(
                    "initial value {initial} is not a valid {}",
                    self.ty
                )));
            }
        }

        match self.operator {
            Operator::Constant if self.initial.is_none() => {
                Err(reject("constant operator requires a value".to_string()))
            }
            Operator::Default if !self.optional && self.initial.is_none() => Err(reject(
                "mandatory default operator requires a value".to_string(),
            )),
            Operator::Increment if !self.ty.is_integer() => Err(reject(format!(
                "increment operator is not applicable to {}",
                self.ty
            ))),
            Operator::Tail if !self.ty.is_sequence_of_bytes() => Err(reject(format!(
                "tail operator is not applicable to {}",
                self.ty
            ))),
            _ => Ok(()),
        }
    }
}

/// Group instruction: a nested list of instructions.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Group {
    /// Group name.
    pub name: Arc<str>,
    /// Whether the group may be absent (one bit in the enclosing map).
    pub optional: bool,
    /// Nested instructions.
    pub instructions: Vec<Instruction>,
}

impl Group {
    /// Creates an empty mandatory group.
    #[must_use]
    pub fn new(name: impl Into<Arc<str>>) -> Self {
        Self {
            name: name.into(),
            optional: false,
            instructions: Vec::new(),
        }
    }

    /// Marks the group optional.
    #[must_use]
    pub fn optional(mut self) -> Self {
        self.optional = true;
        self
    }

    /// Appends an instruction.
    #[must_use]
    pub fn instruction(mut self, instruction: impl Into<Instruction>) -> Self {
        self.instructions.push(instruction.into());
        self
    }
}

/// Sequence instruction: a length field followed by repeated elements.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Sequence {
    /// Sequence name.
    pub name: Arc<str>,
    /// Length field, always of type `UInt32`.
    pub length: ScalarField,
    /// Instructions of one element.
    pub instructions: Vec<Instruction>,
}

impl Sequence {
    /// Creates a mandatory sequence with a plain length field.
    #[must_use]
    pub fn new(name: impl Into<Arc<str>>, length_name: impl Into<Arc<str>>) -> Self {
        Self {
            name: name.into(),
            length: ScalarField::new(length_name, ScalarType::UInt32),
            instructions: Vec::new(),
        }
    }

    /// Marks the sequence optional (the length becomes nullable).
    #[must_use]
    pub fn optional(mut self) -> Self {
        self.length.optional = true;
        self
    }

    /// Sets the operator of the length field.
    #[must_use]
    pub fn with_length_operator(mut self, operator: Operator) -> Self {
        self.length.operator = operator;
        self
    }

    /// Replaces the length field.
    #[must_use]
    pub fn with_length(mut self, length: ScalarField) -> Self {
        self.length = length;
        self
    }

    /// Appends an instruction to the element.
    #[must_use]
    pub fn instruction(mut self, instruction: impl Into<Instruction>) -> Self {
        self.instructions.push(instruction.into());
        self
    }

    /// Returns true if the sequence may be absent.
    #[must_use]
    pub fn is_optional(&self) -> bool {
        self.length.optional
    }
}

/// One template instruction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Instruction {
    /// Scalar field.
    Field(ScalarField),
    /// Nested group.
    Group(Group),
    /// Repeating group.
    Sequence(Sequence),
    /// Static reference: the referenced template's instructions are decoded
    /// in place.
    TemplateRef(u32),
}

impl Instruction {
    /// Returns the instruction name.
    #[must_use]
    pub fn name(&self) -> &str {
        match self {
            Self::Field(f) => &f.name,
            Self::Group(g) => &g.name,
            Self::Sequence(s) => &s.name,
            Self::TemplateRef(_) => "templateRef",
        }
    }
}

impl From<ScalarField> for Instruction {
    fn from(field: ScalarField) -> Self {
        Self::Field(field)
    }
}

impl From<Group> for Instruction {
    fn from(group: Group) -> Self {
        Self::Group(group)
    }
}

impl From<Sequence> for Instruction {
    fn from(sequence: Sequence) -> Self {
        Self::Sequence(sequence)
    }
}

/// Counts the bits a list of instructions takes in its own presence map.
///
/// Nested groups and sequence elements carry their own maps; only an
/// optional group's bit and the sequence length field count here. Static
/// references are followed through `registry`.
#[must_use]
pub fn presence_bits(instructions: &[Instruction], registry: &TemplateRegistry) -> usize {
    count_bits(instructions, registry, 0)
}

fn count_bits(instructions: &[Instruction], registry: &TemplateRegistry, depth: usize) -> usize {
    instructions
        .iter()
        .map(|instruction| match instruction {
            Instruction::Field(f) => f.presence_bits(),
            Instruction::Group(g) => usize::from(g.optional),
            Instruction::Sequence(s) => s.length.presence_bits(),
            Instruction::TemplateRef(id) if depth < MAX_REFERENCE_DEPTH => registry
                .get(*id)
                .map_or(0, |t| count_bits(&t.instructions, registry, depth + 1)),
            Instruction::TemplateRef(_) => 0,
        })
        .sum()
}

/// FAST template definition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Template {
    /// Template id.
    pub id: u32,
    /// Template name.
    pub name: Arc<str>,
    /// Application type name, used by the `Type` dictionary scope.
    pub type_name: Option<Arc<str>>,
    /// Top-level instructions.
    pub instructions: Vec<Instruction>,
}

impl Template {
    /// Creates an empty template.
    #[must_use]
    pub fn new(id: u32, name: impl Into<Arc<str>>) -> Self {
        Self {
            id,
            name: name.into(),
            type_name: None,
            instructions: Vec::new(),
        }
    }

    /// Sets the application type name.
    #[must_use]
    pub fn with_type_name(mut self, type_name: impl Into<Arc<str>>) -> Self {
        self.type_name = Some(type_name.into());
        self
    }

    /// Appends an instruction.
    #[must_use]
    pub fn instruction(mut self, instruction: impl Into<Instruction>) -> Self {
        self.instructions.push(instruction.into());
        self
    }

    /// Appends a scalar field.
    #[must_use]
    pub fn field(self, field: ScalarField) -> Self {
        self.instruction(field)
    }

    /// Appends a static template reference.
    #[must_use]
    pub fn template_ref(self, template_id: u32) -> Self {
        self.instruction(Instruction::TemplateRef(template_id))
    }

    /// Returns the type name used for `Type`-scoped dictionary entries.
    #[must_use]
    pub fn dictionary_type(&self) -> &Arc<str> {
        self.type_name.as_ref().unwrap_or(&self.name)
    }

    /// Returns the number of field bits this template takes in a message's
    /// presence map, excluding the template id bit.
    #[must_use]
    pub fn presence_bits(&self, registry: &TemplateRegistry) -> usize {
        presence_bits(&self.instructions, registry)
    }

    /// Checks operator/type compatibility of every field.
    ///
    /// # Errors
    /// Returns `FastError::InvalidTemplate` describing the first problem.
    pub fn validate(&self) -> Result<(), FastError> {
        validate_instructions(self.id, &self.instructions)
    }
}

fn validate_instructions(template_id: u32, instructions: &[Instruction]) -> Result<(), FastError> {
    for instruction in instructions {
        match instruction {
            Instruction::Field(f) => f.validate(template_id)?,
            Instruction::Group(g) => validate_instructions(template_id, &g.instructions)?,
            Instruction::Sequence(s) => {
                if s.length.ty != ScalarType::UInt32 {
                    return Err(FastError::InvalidTemplate {
                        template_id,
                        reason: format!("sequence {}: length must be uInt32", s.name),
                    });
                }
                s.length.validate(template_id)?;
                validate_instructions(template_id, &s.instructions)?;
            }
            Instruction::TemplateRef(_) => {}
        }
    }
    Ok(())
}

/// Registry of templates by id.
#[derive(Debug, Clone, Default)]
pub struct TemplateRegistry {
    templates: HashMap<u32, Arc<Template>>,
}

impl TemplateRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Validates and adds a template.
    ///
    /// # Errors
    /// Returns `FastError::InvalidTemplate` if the template fails validation
    /// or its id is already registered.
    pub fn register(&mut self, template: Template) -> Result<(), FastError> {
        template.validate()?;
        if self.templates.contains_key(&template.id) {
            return Err(FastError::InvalidTemplate {
                template_id: template.id,
                reason: "duplicate template id".to_string(),
            });
        }
        self.templates.insert(template.id, Arc::new(template));
        Ok(())
    }

    /// Builder-style [`register`](Self::register).
    ///
    /// # Errors
    /// Same as [`register`](Self::register).
    pub fn with_template(mut self, template: Template) -> Result<Self, FastError> {
        self.register(template)?;
        Ok(self)
    }

    /// Looks up a template.
    #[must_use]
    pub fn get(&self, template_id: u32) -> Option<&Arc<Template>> {
        self.templates.get(&template_id)
    }

    /// Returns true if the id is registered.
    #[must_use]
    pub fn contains(&self, template_id: u32) -> bool {
        self.templates.contains_key(&template_id)
    }

    /// Returns the registered ids in ascending order.
    #[must_use]
    pub fn ids(&self) -> Vec<u32> {
        let mut ids: Vec<u32> = self.templates.keys().copied().collect();
        ids.sort_unstable();
        ids
    }

    /// Returns the number of templates.
    #[must_use]
    pub fn len(&self) -> usize {
        self.templates.len()
    }

    /// Returns true if no template is registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.templates.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn quote_template() -> Template {
        Template::new(7, "Quote")
            .field(ScalarField::new("Symbol", ScalarType::Ascii).with_operator(Operator::Copy))
            .field(ScalarField::new("Px", ScalarType::Decimal).with_operator(Operator::Delta))
            .field(ScalarField::new("Venue", ScalarType::Ascii).optional())
            .field(
                ScalarField::new("Source", ScalarType::Ascii)
                    .optional()
                    .with_operator(Operator::Constant)
                    .with_initial("102"),
            )
            .instruction(Group::new("Extra").optional())
            .instruction(
                Sequence::new("Entries", "NoEntries")
                    .with_length_operator(Operator::Copy)
                    .instruction(
                        ScalarField::new("Size", ScalarType::UInt64)
                            .with_operator(Operator::Increment),
                    ),
            )
    }

    #[test]
    fn test_presence_bits() {
        let registry = TemplateRegistry::new();
        // Symbol(copy) + Source(optional constant) + Extra(optional group) + NoEntries(copy)
        assert_eq!(quote_template().presence_bits(&registry), 4);
    }

    #[test]
    fn test_presence_bits_follow_static_reference() {
        let registry = TemplateRegistry::new()
            .with_template(quote_template())
            .unwrap();
        let outer = Template::new(8, "Outer")
            .field(ScalarField::new("Seq", ScalarType::UInt32).with_operator(Operator::Increment))
            .template_ref(7);
        assert_eq!(outer.presence_bits(&registry), 5);
    }

    #[test]
    fn test_dictionary_key_defaults_to_name() {
        let field = ScalarField::new("NumTrades", ScalarType::Int64);
        assert_eq!(&**field.dictionary_key(), "NumTrades");
        let field = field.with_key("trades");
        assert_eq!(&**field.dictionary_key(), "trades");
    }

    #[test]
    fn test_registry_rejects_invalid_operators() {
        let mut registry = TemplateRegistry::new();

        let err = registry
            .register(Template::new(1, "Bad").field(
                ScalarField::new("Name", ScalarType::Ascii).with_operator(Operator::Increment),
            ))
            .unwrap_err();
        assert!(matches!(err, FastError::InvalidTemplate { template_id: 1, .. }));

        let err = registry
            .register(Template::new(2, "Bad").field(
                ScalarField::new("Src", ScalarType::Ascii).with_operator(Operator::Constant),
            ))
            .unwrap_err();
        assert!(err.to_string().contains("constant operator requires a value"));

        let err = registry
            .register(Template::new(3, "Bad").field(
                ScalarField::new("Qty", ScalarType::UInt32).with_initial(ScalarValue::Int(-1)),
            ))
            .unwrap_err();
        assert!(matches!(err, FastError::InvalidTemplate { template_id: 3, .. }));

        let err = registry
            .register(Template::new(4, "Bad").instruction(
                Sequence::new("Entries", "NoEntries")
                    .with_length(ScalarField::new("NoEntries", ScalarType::Int32)),
            ))
            .unwrap_err();
        assert!(err.to_string().contains("length must be uInt32"));

        assert!(registry.is_empty());
    }

    #[test]
    fn test_registry_rejects_duplicate_id() {
        let mut registry = TemplateRegistry::new();
        registry.register(quote_template()).unwrap();
        assert!(registry.register(quote_template()).is_err());
        assert_eq!(registry.ids(), vec![7]);
        assert!(registry.contains(7));
    }

    #[test]
    fn test_template_builder() {
        let template = quote_template();
        assert_eq!(template.instructions.len(), 6);
        assert_eq!(template.instructions[4].name(), "Extra");
        assert_eq!(&**template.dictionary_type(), "Quote");
        assert_eq!(
            &**template.clone().with_type_name("MarketData").dictionary_type(),
            "MarketData"
        );
    }
}
