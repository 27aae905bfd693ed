//! Sync envelopes exchanged between the host and the worker.

use crate::action::{Action, SYNC_FOR_CLIENT_STORE, SYNC_FOR_WORKER_STORE};
use crate::error::{ProtocolError, ProtocolResult};
use crate::records::{records_from_value, records_to_value};
use storesync_diff::ChangeRecord;
use storesync_value::{Map, Value};

const TYPE_FIELD: &str = "type";
const DIFFERENCES_FIELD: &str = "differences";
const INIT_FIELD: &str = "isInitAction";
const ACTION_FIELD: &str = "action";
const PARTIAL_STATE_FIELD: &str = "partialState";

/// Change records sent from the worker to the host.
#[derive(Debug, Clone, PartialEq)]
pub struct SyncForClient {
    /// Records to apply, in order.
    pub differences: Vec<ChangeRecord>,
    /// Set on the first full sync answering the host's bootstrap action.
    pub is_init_action: bool,
    /// The action whose dispatch produced the records, if any.
    pub action: Option<Action>,
}

impl SyncForClient {
    /// Creates an ordinary (non-init) envelope.
    pub fn new(differences: Vec<ChangeRecord>) -> Self {
        Self {
            differences,
            is_init_action: false,
            action: None,
        }
    }

    /// Creates the initial full-sync envelope.
    pub fn init(differences: Vec<ChangeRecord>) -> Self {
        Self {
            differences,
            is_init_action: true,
            action: None,
        }
    }

    /// Attaches the originating action.
    #[must_use]
    pub fn with_action(mut self, action: Action) -> Self {
        self.action = Some(action);
        self
    }
}

/// A locally dispatched action forwarded from the host to the worker.
#[derive(Debug, Clone, PartialEq)]
pub struct SyncForWorker {
    /// Allow-listed sections of the host's post-dispatch state.
    pub partial_state: Value,
    /// The action the host dispatched.
    pub action: Action,
}

impl SyncForWorker {
    /// Creates a new forwarding envelope.
    pub fn new(partial_state: Value, action: Action) -> Self {
        Self {
            partial_state,
            action,
        }
    }
}

/// A sync protocol message.
#[derive(Debug, Clone, PartialEq)]
pub enum Envelope {
    /// Worker to host.
    SyncForClient(SyncForClient),
    /// Host to worker.
    SyncForWorker(SyncForWorker),
}

impl Envelope {
    /// Returns the wire `type` of the envelope.
    pub fn type_name(&self) -> &'static str {
        match self {
            Envelope::SyncForClient(_) => SYNC_FOR_CLIENT_STORE,
            Envelope::SyncForWorker(_) => SYNC_FOR_WORKER_STORE,
        }
    }

    /// Builds the message value sent over the channel.
    pub fn to_message(&self) -> Value {
        let mut entries = Map::new();
        entries.insert(TYPE_FIELD.into(), Value::from(self.type_name()));
        match self {
            Envelope::SyncForClient(envelope) => {
                entries.insert(
                    DIFFERENCES_FIELD.into(),
                    records_to_value(&envelope.differences),
                );
                if envelope.is_init_action {
                    entries.insert(INIT_FIELD.into(), Value::Bool(true));
                }
                if let Some(action) = &envelope.action {
                    entries.insert(ACTION_FIELD.into(), action.to_value());
                }
            }
            Envelope::SyncForWorker(envelope) => {
                entries.insert(PARTIAL_STATE_FIELD.into(), envelope.partial_state.clone());
                entries.insert(ACTION_FIELD.into(), envelope.action.to_value());
            }
        }
        Value::from(entries)
    }

    /// Reads an envelope from a received message.
    ///
    /// Returns `Ok(None)` for anything that is not a sync envelope: non-object
    /// messages and messages with a missing or unrecognized `type`. A message
    /// with a sync `type` but malformed fields is an error.
    pub fn from_message(message: &Value) -> ProtocolResult<Option<Envelope>> {
        let Some(object) = message.as_object() else {
            return Ok(None);
        };
        match object.get(TYPE_FIELD).and_then(Value::as_text) {
            Some(SYNC_FOR_CLIENT_STORE) => {
                let differences = object.get(DIFFERENCES_FIELD).ok_or_else(|| {
                    ProtocolError::invalid_envelope(SYNC_FOR_CLIENT_STORE, "missing differences")
                })?;
                let differences = records_from_value(differences)?;
                let is_init_action = match object.get(INIT_FIELD) {
                    None | Some(Value::Undefined) => false,
                    Some(value) => value.as_bool().ok_or_else(|| {
                        ProtocolError::invalid_envelope(
                            SYNC_FOR_CLIENT_STORE,
                            "isInitAction must be a boolean",
                        )
                    })?,
                };
                let action = match object.get(ACTION_FIELD) {
                    None | Some(Value::Undefined) => None,
                    Some(value) => Some(Action::from_value(value).ok_or_else(|| {
                        ProtocolError::invalid_envelope(
                            SYNC_FOR_CLIENT_STORE,
                            "action must be an object",
                        )
                    })?),
                };
                Ok(Some(Envelope::SyncForClient(SyncForClient {
                    differences,
                    is_init_action,
                    action,
                })))
            }
            Some(SYNC_FOR_WORKER_STORE) => {
                let partial_state = object
                    .get(PARTIAL_STATE_FIELD)
                    .filter(|value| value.as_object().is_some())
                    .cloned()
                    .ok_or_else(|| {
                        ProtocolError::invalid_envelope(
                            SYNC_FOR_WORKER_STORE,
                            "partialState must be an object",
                        )
                    })?;
                let action = object
                    .get(ACTION_FIELD)
                    .and_then(Action::from_value)
                    .ok_or_else(|| {
                        ProtocolError::invalid_envelope(
                            SYNC_FOR_WORKER_STORE,
                            "action must be an object",
                        )
                    })?;
                Ok(Some(Envelope::SyncForWorker(SyncForWorker {
                    partial_state,
                    action,
                })))
            }
            _ => Ok(None),
        }
    }

    /// Encodes to CBOR.
    pub fn encode(&self) -> ProtocolResult<Vec<u8>> {
        Ok(storesync_value::encode(&self.to_message())?)
    }

    /// Decodes from CBOR.
    ///
    /// Unlike [`Envelope::from_message`], bytes that decode to something
    /// other than a sync envelope are an error.
    pub fn decode(bytes: &[u8]) -> ProtocolResult<Self> {
        let message = storesync_value::decode(bytes)?;
        Self::from_message(&message)?.ok_or(ProtocolError::NotAnEnvelope)
    }
}

impl From<SyncForClient> for Envelope {
    fn from(envelope: SyncForClient) -> Self {
        Envelope::SyncForClient(envelope)
    }
}

impl From<SyncForWorker> for Envelope {
    fn from(envelope: SyncForWorker) -> Self {
        Envelope::SyncForWorker(envelope)
    }
}
