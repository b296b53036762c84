//! Session context
//!
//! A [`Context`] owns the transport and its one-time initialization. Nodes
//! are created through it and spin while it is ok.

use crate::config::ReactorConfig;
use crate::error::RclResult;
use crate::node::Node;
use crate::transport::{LoopbackTransport, Transport};
use once_cell::sync::OnceCell;
use std::sync::Arc;
use tracing::info;

pub struct Context {
    transport: Arc<dyn Transport>,
    config: ReactorConfig,
    initialized: OnceCell<()>,
}

impl Context {
    pub fn new(transport: Arc<dyn Transport>) -> Self {
        Self::with_config(transport, ReactorConfig::default())
    }

    pub fn with_config(transport: Arc<dyn Transport>, config: ReactorConfig) -> Self {
        Self {
            transport,
            config,
            initialized: OnceCell::new(),
        }
    }

    /// Context over a fresh loopback transport configured from `config`.
    pub fn loopback(config: ReactorConfig) -> Self {
        let transport = Arc::new(LoopbackTransport::with_config(config.loopback.clone()));
        Self::with_config(transport, config)
    }

    /// Initialize the transport. Only the first call does any work; later
    /// calls, from any thread, return immediately.
    pub fn init(&self) -> RclResult<()> {
        self.initialized.get_or_try_init(|| {
            self.transport.init()?;
            info!(
                implementation = self.transport.implementation_identifier(),
                "transport initialized"
            );
            Ok::<(), crate::error::RclError>(())
        })?;
        Ok(())
    }

    /// Whether the context was initialized and has not been shut down.
    pub fn ok(&self) -> bool {
        self.initialized.get().is_some() && self.transport.is_active()
    }

    /// Shut the transport down, waking any blocked spin.
    pub fn shutdown(&self) -> RclResult<()> {
        self.transport.shutdown()?;
        info!("transport shut down");
        Ok(())
    }

    pub fn implementation_identifier(&self) -> &str {
        self.transport.implementation_identifier()
    }

    pub fn transport(&self) -> &Arc<dyn Transport> {
        &self.transport
    }

    pub fn config(&self) -> &ReactorConfig {
        &self.config
    }

    /// Create a node, initializing the context first if needed.
    pub fn create_node(&self, name: &str, namespace: &str) -> RclResult<Node> {
        self.init()?;
        Node::create(
            &self.transport,
            name,
            namespace,
            self.config.qos.clone(),
            self.config.executor.spin_timeout(),
        )
    }
}
