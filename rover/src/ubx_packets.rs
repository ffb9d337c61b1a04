pub mod cfg_val;
mod message;
pub mod schema;
mod types;

pub use cfg_val::{
    cfg_key_to_name, cfg_name_to_key, CfgKey, CfgKeyRef, CfgLayerGet, CfgLayerSet, KeyId,
    StorageSize, Transaction, MAX_CFG_KEYS,
};
pub use message::{UbxMessage, UbxMessageBuilder};
pub use schema::{identity_of, payload_schema, Descriptor, Field, RepeatCount, Schema};
pub use types::{gnss_name, AttrType, FixType, MsgMode, Value};
