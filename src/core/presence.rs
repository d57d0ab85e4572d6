use std::collections::BTreeSet;

use super::AppCore;

impl AppCore {
    /// Presence pushes carry the complete online set; replace, never merge.
    /// Staleness between pushes is acceptable and expected.
    pub(super) fn on_presence_replaced(&mut self, epoch: u64, online_ids: Vec<String>) {
        if !self.channel_epoch_current(epoch) {
            tracing::debug!(epoch, "stale presence push discarded");
            return;
        }
        let next: BTreeSet<String> = online_ids.into_iter().collect();
        if next != self.state.online_peers {
            tracing::debug!(online = next.len(), "presence replaced");
            self.state.online_peers = next;
            self.emit_state();
        }
    }
}
