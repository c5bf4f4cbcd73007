//! Command routing - `"<verb>/<payload>"` strings to annotation operations
//!
//! Grammar:
//! - `getList/<tissuePath>`
//! - `load/<annotationId>`
//! - `save/<tissuePath>,<name>,<json>` (split into at most three fields,
//!   so the JSON may contain commas)
//! - `remove/<annotationId>`

use std::time::Instant;
use serde_json::{json, Value};
use crate::annotation::AnnotationStore;
use crate::blob::BlobGateway;
use crate::response::RequestContext;
use crate::storage::MetadataGateway;
use crate::{Error, Result};

/// A parsed annotation command
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    GetList { tissue_path: String },
    Load { id: i64 },
    Save { tissue_path: String, name: String, json: String },
    Remove { id: i64 },
}

impl Command {
    /// Parse a raw command string
    pub fn parse(raw: &str) -> Result<Self> {
        let (verb, payload) = raw
            .split_once('/')
            .ok_or_else(|| Error::MalformedCommand(format!("no arguments were specified in {:?}", raw)))?;
        if payload.is_empty() {
            return Err(Error::MalformedCommand(format!("no arguments were specified for {}", verb)));
        }

        match verb {
            "getList" => Ok(Command::GetList { tissue_path: payload.to_string() }),
            "load" => Ok(Command::Load { id: parse_id(payload)? }),
            "save" => {
                let fields: Vec<&str> = payload.splitn(3, ',').collect();
                match fields.as_slice() {
                    [tissue_path, name, json] => Ok(Command::Save {
                        tissue_path: tissue_path.to_string(),
                        name: name.to_string(),
                        json: json.to_string(),
                    }),
                    _ => Err(Error::MalformedCommand(format!(
                        "save expects <tissuePath>,<name>,<json> but got {} field(s)",
                        fields.len()
                    ))),
                }
            }
            "remove" => Ok(Command::Remove { id: parse_id(payload)? }),
            other => Err(Error::MalformedCommand(format!("unknown annotation verb {:?}", other))),
        }
    }

    pub fn verb(&self) -> &'static str {
        match self {
            Command::GetList { .. } => "getList",
            Command::Load { .. } => "load",
            Command::Save { .. } => "save",
            Command::Remove { .. } => "remove",
        }
    }
}

fn parse_id(text: &str) -> Result<i64> {
    text.trim()
        .parse()
        .map_err(|_| Error::InvalidId(text.to_string()))
}

/// Routes commands to the annotation store and shapes their responses
pub struct Router<M, B> {
    store: AnnotationStore<M, B>,
}

impl<M: MetadataGateway, B: BlobGateway> Router<M, B> {
    pub fn new(store: AnnotationStore<M, B>) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &AnnotationStore<M, B> {
        &self.store
    }

    /// Parse and run a raw command, returning its response document
    pub fn dispatch(&self, raw: &str) -> Result<Value> {
        let command = Command::parse(raw)?;
        self.execute(&command)
    }

    pub fn execute(&self, command: &Command) -> Result<Value> {
        match command {
            Command::GetList { tissue_path } => {
                let list = self.store.get_list(tissue_path)?;
                Ok(serde_json::to_value(list)?)
            }
            Command::Load { id } => self.store.load(*id),
            Command::Save { tissue_path, name, json } => {
                self.store.save(tissue_path, name, json)?;
                Ok(json!({ "success": true }))
            }
            Command::Remove { id } => {
                self.store.remove(*id)?;
                Ok(json!({ "success": true }))
            }
        }
    }

    /// Run a raw command for one request and emit its response.
    ///
    /// Errors are returned untouched; turning them into an error response
    /// is up to the transport.
    pub fn handle(&self, ctx: &mut RequestContext<'_>, raw: &str) -> Result<()> {
        let span = ctx.span.clone();
        let _guard = span.enter();
        let started = Instant::now();

        let command = Command::parse(raw)?;
        tracing::debug!(verb = command.verb(), "Annotation handler reached");

        let document = self.execute(&command)?;
        ctx.emit(&document)?;

        tracing::debug!(
            verb = command.verb(),
            elapsed_us = started.elapsed().as_micros() as u64,
            "Annotation command complete"
        );
        Ok(())
    }
}
