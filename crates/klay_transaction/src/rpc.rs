use serde_json::{Map, Value};

use crate::{Transaction, TransactionVariant as _};

impl Transaction {
    /// Returns the representation served over RPC. Unlike the JSON
    /// representation, it always carries the type, never carries the sender
    /// or hash, and carries the decoded payload of anchoring transactions as
    /// `inputJSON`.
    pub fn rpc_output(&self) -> Map<String, Value> {
        let tx_type = self.tx_type();

        let mut json = self.internal_data().to_json();
        json.type_int = Some(tx_type);
        json.type_name = Some(tx_type.name().to_string());
        json.from = None;

        let mut output = match serde_json::to_value(json) {
            Ok(Value::Object(output)) => output,
            Ok(_) => Map::new(),
            Err(error) => {
                log::error!("Failed to serialize a {tx_type}: {error}");
                Map::new()
            }
        };

        if let Ok(anchored_data) = self.anchored_data() {
            let decoded = klay_anchor::decode_to_json(anchored_data).unwrap_or_else(|error| {
                log::trace!("Failed to decode the anchored data: {error}");
                Value::Null
            });
            output.insert("inputJSON".to_string(), decoded);
        }

        output
    }
}
