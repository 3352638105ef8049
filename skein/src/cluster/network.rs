use crate::cluster::Registry;
use crate::handler::in_handler;
use crate::topology::NodeId;
use crate::transport::{Network, ShareMessage, ShareReply, StealRequest};
use std::sync::Arc;
use tracing::warn;

/// In-process [`Network`]: every message is delivered inline, on the calling
/// thread, as a handler.
#[derive(Debug)]
pub struct LoopbackNetwork {
    registry: Arc<Registry>,
}

impl LoopbackNetwork {
    pub fn new(registry: Arc<Registry>) -> Self {
        Self { registry }
    }
}

impl Network for LoopbackNetwork {
    fn request_steal(&self, req: StealRequest) {
        let Some(thief) = self.registry.get(req.thief) else {
            warn!(thief = %req.thief, "steal request from unknown node");
            return;
        };

        let tasks = match self.registry.get(req.victim) {
            Some(victim) => in_handler(|| victim.serve_steal(req)),
            None => Vec::new(),
        };

        in_handler(|| thief.complete_steal(req.victim, tasks));
    }

    fn send_share(&self, msg: ShareMessage) {
        let Some(from) = self.registry.get(msg.from()) else {
            warn!(from = %msg.from(), "workshare from unknown node");
            return;
        };

        let reply = match self.registry.get(msg.to()) {
            Some(peer) => in_handler(|| peer.handle_share(msg)),
            None => match msg {
                ShareMessage::Give { tasks, .. } => ShareReply::Unreachable { tasks },
                ShareMessage::Ask { .. } => ShareReply::Unreachable { tasks: Vec::new() },
            },
        };

        in_handler(|| from.complete_share(reply));
    }

    fn load_of(&self, node: NodeId) -> Option<usize> {
        self.registry.get(node).map(|m| m.public_len())
    }
}
