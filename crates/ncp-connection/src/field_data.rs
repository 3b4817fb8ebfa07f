use ncp_pdu::{Identifier, Parameter};

/// An outgoing field: a name plus its ordered parameters, ready to be
/// wrapped in a packet by `send`/`send_packet`.
#[derive(Clone, Debug)]
pub struct FieldData {
    pub name: Identifier,
    pub params: Vec<Parameter>,
}

impl FieldData {
    pub fn new(name: Identifier, params: Vec<Parameter>) -> Self {
        Self { name, params }
    }
}

impl From<Identifier> for FieldData {
    fn from(name: Identifier) -> Self {
        Self { name, params: vec![] }
    }
}
