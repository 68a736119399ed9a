/******************************************************************************
   Author: Joaquín Béjar García
   Email: jb@taunais.com
   Date: 27/1/26
******************************************************************************/

//! FAST protocol decoder.
//!
//! [`FastDecoder`] is the session context: it holds the shared template
//! registry, the session dictionary and the last template id, and walks a
//! template's instructions to turn a payload into [`Message`]s. One decoder
//! serves one logical stream; independent streams use independent decoders.

use crate::codec;
use crate::config::FastConfig;
use crate::dictionary::{Dictionary, TemplateScope};
use crate::error::FastError;
use crate::message::{FieldValue, GroupValue, Message};
use crate::operators;
use crate::pmap::PresenceMap;
use crate::template::{self, Instruction, Sequence, TemplateRegistry};
use std::sync::Arc;
use tracing::trace;

/// FAST protocol decoder.
#[derive(Debug)]
pub struct FastDecoder {
    /// Template definitions.
    registry: Arc<TemplateRegistry>,
    /// Operator state.
    dictionary: Dictionary,
    /// Last used template ID.
    last_template_id: Option<u32>,
    /// Decoder limits.
    config: FastConfig,
}

impl FastDecoder {
    /// Creates a new FAST decoder over a template registry.
    #[must_use]
    pub fn new(registry: Arc<TemplateRegistry>) -> Self {
        Self {
            registry,
            dictionary: Dictionary::new(),
            last_template_id: None,
            config: FastConfig::default(),
        }
    }

    /// Sets the decoder configuration.
    #[must_use]
    pub fn with_config(mut self, config: FastConfig) -> Self {
        self.config = config;
        self
    }

    /// Returns the decoder configuration.
    #[must_use]
    pub fn config(&self) -> &FastConfig {
        &self.config
    }

    /// Returns the template registry.
    #[must_use]
    pub fn registry(&self) -> &Arc<TemplateRegistry> {
        &self.registry
    }

    /// Returns the session dictionary.
    #[must_use]
    pub fn dictionary(&self) -> &Dictionary {
        &self.dictionary
    }

    /// Returns the id of the last successfully decoded message's template.
    #[must_use]
    pub const fn last_template_id(&self) -> Option<u32> {
        self.last_template_id
    }

    /// Resets the decoder state.
    pub fn reset(&mut self) {
        self.dictionary.reset();
        self.last_template_id = None;
    }

    /// Decodes one message: presence map, template id, then fields.
    ///
    /// The first presence bit tells whether a template id follows; when it
    /// is clear the previous message's template is reused.
    ///
    /// # Arguments
    /// * `data` - The input bytes
    /// * `offset` - Current position (will be updated)
    ///
    /// # Errors
    /// Returns `FastError` if the message cannot be decoded. The session
    /// dictionary is left as it was before the call.
    pub fn decode_message(&mut self, data: &[u8], offset: &mut usize) -> Result<Message, FastError> {
        let start = *offset;
        let mut pmap = self.read_pmap(data, offset)?;

        let template_id = if pmap.next_bit()? {
            let id_offset = *offset;
            let id = codec::decode_uint(data, offset)?;
            u32::try_from(id).map_err(|_| FastError::IntegerOverflow { offset: id_offset })?
        } else {
            self.last_template_id
                .ok_or(FastError::MissingTemplateId { offset: start })?
        };

        self.decode_body(template_id, pmap, data, offset, start)
    }

    /// Decodes one message whose template id is known out of band.
    ///
    /// The message starts with its presence map; no template id bit or
    /// template id is read.
    ///
    /// # Errors
    /// Same as [`decode_message`](Self::decode_message).
    pub fn decode_template(
        &mut self,
        template_id: u32,
        data: &[u8],
        offset: &mut usize,
    ) -> Result<Message, FastError> {
        let start = *offset;
        let pmap = self.read_pmap(data, offset)?;
        self.decode_body(template_id, pmap, data, offset, start)
    }

    /// Decodes every message in `data`.
    ///
    /// # Errors
    /// Returns the first error; messages decoded before it are discarded but
    /// their dictionary updates are kept.
    pub fn decode_all(&mut self, data: &[u8]) -> Result<Vec<Message>, FastError> {
        let mut offset = 0;
        let mut messages = Vec::new();
        while offset < data.len() {
            messages.push(self.decode_message(data, &mut offset)?);
        }
        Ok(messages)
    }

    fn read_pmap(&self, data: &[u8], offset: &mut usize) -> Result<PresenceMap, FastError> {
        Ok(PresenceMap::decode(data, offset)?.with_strict(self.config.strict_presence_map))
    }

    fn decode_body(
        &mut self,
        template_id: u32,
        mut pmap: PresenceMap,
        data: &[u8],
        offset: &mut usize,
        start: usize,
    ) -> Result<Message, FastError> {
        let registry = Arc::clone(&self.registry);
        let template = registry
            .get(template_id)
            .ok_or(FastError::UnknownTemplate {
                template_id,
                offset: start,
            })?;

        if self.last_template_id != Some(template_id) {
            trace!(template_id, name = %template.name, offset = start, "template switch");
        }

        let scope = TemplateScope::new(template.id, Arc::clone(template.dictionary_type()));
        let result = self.decode_segment(
            &registry,
            &scope,
            &template.instructions,
            &mut pmap,
            data,
            offset,
            0,
        );

        match result {
            Ok(fields) => {
                self.dictionary.commit();
                self.last_template_id = Some(template_id);
                trace!(template_id, start, end = *offset, "decoded message");
                Ok(Message::new(template_id, fields))
            }
            Err(e) => {
                self.dictionary.rollback();
                Err(e)
            }
        }
    }

    #[allow(clippy::too_many_arguments)]
    fn decode_segment(
        &mut self,
        registry: &TemplateRegistry,
        scope: &TemplateScope,
        instructions: &[Instruction],
        pmap: &mut PresenceMap,
        data: &[u8],
        offset: &mut usize,
        depth: usize,
    ) -> Result<GroupValue, FastError> {
        if depth > self.config.max_depth {
            return Err(FastError::NestingTooDeep {
                depth,
                max: self.config.max_depth,
            });
        }

        let mut out = GroupValue::with_capacity(instructions.len());
        for instruction in instructions {
            let at = *offset;
            let context = |e: FastError| e.in_field(scope.template_id, instruction.name(), at);

            match instruction {
                Instruction::Field(field) => {
                    let value = operators::decode_field(
                        field,
                        scope,
                        pmap,
                        data,
                        offset,
                        &mut self.dictionary,
                    )
                    .map_err(context)?;
                    out.push(Arc::clone(&field.name), value.into());
                }
                Instruction::Group(group) => {
                    if group.optional && !pmap.next_bit().map_err(context)? {
                        out.push(Arc::clone(&group.name), FieldValue::Null);
                        continue;
                    }
                    let value = self
                        .decode_nested(registry, scope, &group.instructions, data, offset, depth + 1)
                        .map_err(context)?;
                    out.push(Arc::clone(&group.name), FieldValue::Group(value));
                }
                Instruction::Sequence(sequence) => {
                    let value = self
                        .decode_sequence(registry, scope, sequence, pmap, data, offset, depth + 1)
                        .map_err(context)?;
                    out.push(Arc::clone(&sequence.name), value);
                }
                Instruction::TemplateRef(id) => {
                    let target = registry
                        .get(*id)
                        .ok_or(FastError::UnknownTemplate {
                            template_id: *id,
                            offset: at,
                        })
                        .map_err(context)?;
                    let inner = TemplateScope::new(target.id, Arc::clone(target.dictionary_type()));
                    let nested = self
                        .decode_segment(
                            registry,
                            &inner,
                            &target.instructions,
                            pmap,
                            data,
                            offset,
                            depth + 1,
                        )
                        .map_err(context)?;
                    out.append(nested);
                }
            }
        }
        Ok(out)
    }

    /// Decodes a group body or sequence element, reading its own presence
    /// map when its instructions need one.
    fn decode_nested(
        &mut self,
        registry: &TemplateRegistry,
        scope: &TemplateScope,
        instructions: &[Instruction],
        data: &[u8],
        offset: &mut usize,
        depth: usize,
    ) -> Result<GroupValue, FastError> {
        let mut pmap = if template::presence_bits(instructions, registry) > 0 {
            self.read_pmap(data, offset)?
        } else {
            PresenceMap::new()
        };
        self.decode_segment(registry, scope, instructions, &mut pmap, data, offset, depth)
    }

    #[allow(clippy::too_many_arguments)]
    fn decode_sequence(
        &mut self,
        registry: &TemplateRegistry,
        scope: &TemplateScope,
        sequence: &Sequence,
        pmap: &mut PresenceMap,
        data: &[u8],
        offset: &mut usize,
        depth: usize,
    ) -> Result<FieldValue, FastError> {
        let length_offset = *offset;
        let length = operators::decode_field(
            &sequence.length,
            scope,
            pmap,
            data,
            offset,
            &mut self.dictionary,
        )
        .map_err(|e| e.in_field(scope.template_id, &sequence.length.name, length_offset))?;

        let Some(length) = length else {
            return Ok(FieldValue::Null);
        };
        let length = length.as_u64().ok_or(FastError::TypeMismatch {
            expected: "uInt32",
            found: length.type_name(),
        })?;
        let max = self.config.max_sequence_length;
        if length > u64::from(max) {
            return Err(FastError::SequenceTooLong { length, max });
        }

        let mut elements = Vec::with_capacity(length.min(64) as usize);
        for _ in 0..length {
            elements.push(self.decode_nested(
                registry,
                scope,
                &sequence.instructions,
                data,
                offset,
                depth,
            )?);
        }
        Ok(FieldValue::Sequence(elements))
    }
}
