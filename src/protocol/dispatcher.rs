use crate::core::serialization::WireFormat;
use crate::error::constants;
use crate::error::{CodecError, Result};
use crate::protocol::envelope::EnvelopeCodec;
use crate::protocol::packet::PacketInstance;
use std::borrow::Cow;
use std::collections::HashMap;
use std::sync::{Arc, RwLock};
use tracing::trace;

type HandlerFn =
    dyn Fn(&PacketInstance) -> Result<Option<PacketInstance>> + Send + Sync + 'static;

/// Packet router keyed by schema type id.
/// Uses Cow<'static, str> so catalog type ids register without allocating.
#[derive(Clone)]
pub struct Dispatcher {
    handlers: Arc<RwLock<HashMap<Cow<'static, str>, Box<HandlerFn>>>>,
}

impl Default for Dispatcher {
    fn default() -> Self {
        Self::new()
    }
}

impl Dispatcher {
    pub fn new() -> Self {
        Self {
            handlers: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    /// Register a handler; a later registration for the same type id replaces it.
    /// A handler returns `Some(reply)` to answer or `None` to consume silently.
    pub fn register<F>(&self, type_id: impl Into<Cow<'static, str>>, handler: F) -> Result<()>
    where
        F: Fn(&PacketInstance) -> Result<Option<PacketInstance>> + Send + Sync + 'static,
    {
        let mut handlers = self.handlers.write().map_err(|_| {
            CodecError::Custom(constants::ERR_DISPATCHER_WRITE_LOCK.to_string())
        })?;

        handlers.insert(type_id.into(), Box::new(handler));
        Ok(())
    }

    pub fn dispatch(&self, packet: &PacketInstance) -> Result<Option<PacketInstance>> {
        let handlers = self.handlers.read().map_err(|_| {
            CodecError::Custom(constants::ERR_DISPATCHER_READ_LOCK.to_string())
        })?;

        let handler = handlers
            .get(packet.type_id())
            .ok_or_else(|| CodecError::NoHandler {
                type_id: packet.type_id().to_string(),
            })?;
        trace!(type_id = %packet.type_id(), "Dispatching packet");
        handler(packet)
    }

    /// Decode, route, and encode any reply in the same format
    pub fn dispatch_bytes(
        &self,
        codec: &EnvelopeCodec,
        input: &[u8],
        format: WireFormat,
    ) -> Result<Option<Vec<u8>>> {
        let packet = codec.decode(input, format)?;
        self.dispatch(&packet)?
            .map(|reply| codec.encode(&reply, format))
            .transpose()
    }

    pub fn has_handler(&self, type_id: &str) -> bool {
        self.handlers
            .read()
            .map(|handlers| handlers.contains_key(type_id))
            .unwrap_or(false)
    }
}
