//! Periodic playback driver
//!
//! Rooms only advance when something looks at them, so a background task
//! scans every room on a fixed cadence. Start times have one-second
//! resolution, so ticking faster than that buys nothing.

use std::sync::Arc;
use std::time::Duration;

use jamroom_core::RoomManager;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

#[derive(Debug, Clone, Copy)]
pub struct DriverConfig {
    pub tick: Duration,
    /// Evict rooms idle for this long; `None` keeps rooms forever.
    pub room_idle: Option<Duration>,
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct TickReport {
    pub advanced: usize,
    pub evicted: usize,
}

pub fn spawn(manager: Arc<RoomManager>, config: DriverConfig) -> JoinHandle<()> {
    tracing::info!(
        tick_ms = u64::try_from(config.tick.as_millis()).unwrap_or(u64::MAX),
        room_idle_secs = config.room_idle.map_or(0, |idle| idle.as_secs()),
        "Playback driver started"
    );

    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(config.tick);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
        loop {
            ticker.tick().await;
            let report = tick_once(&manager, config.room_idle);
            if report != TickReport::default() {
                tracing::debug!(advanced = report.advanced, evicted = report.evicted, "Playback tick");
            }
        }
    })
}

/// One pass over all rooms.
pub fn tick_once(manager: &RoomManager, room_idle: Option<Duration>) -> TickReport {
    let advanced = manager.advance_expired().len();
    let evicted = room_idle.map_or(0, |idle| manager.evict_idle(idle).len());
    TickReport { advanced, evicted }
}

#[cfg(test)]
mod tests {
    use super::*;
    use jamroom_core::test_utils::{ManualClock, StaticCatalog};
    use jamroom_core::user::user_id_for;

    #[tokio::test]
    async fn test_tick_advances_and_evicts() {
        let catalog = Arc::new(StaticCatalog::new().with_track("1", "One", 2_000));
        let clock = Arc::new(ManualClock::new(0));
        let manager = RoomManager::new(catalog, clock.clone());

        manager.create_room("playing").unwrap();
        manager.create_room("abandoned").unwrap();
        manager.join_room("playing", "a@example.com").unwrap();
        manager
            .enqueue_tracks("playing", &user_id_for("a@example.com"), &["1".to_string()])
            .await
            .unwrap();

        clock.set_ms(1_000);
        assert_eq!(
            tick_once(&manager, Some(Duration::from_secs(60))),
            TickReport::default()
        );

        clock.set_ms(61_000);
        let report = tick_once(&manager, Some(Duration::from_secs(60)));
        assert_eq!(report, TickReport { advanced: 1, evicted: 1 });
        assert!(manager.get_room("abandoned").is_err());
        assert!(manager.get_room("playing").unwrap().current_track().is_none());
    }

    #[tokio::test]
    async fn test_tick_without_eviction() {
        let clock = Arc::new(ManualClock::new(0));
        let manager = RoomManager::new(Arc::new(StaticCatalog::new()), clock.clone());
        manager.create_room("lounge").unwrap();

        clock.set_ms(i64::from(u32::MAX));
        assert_eq!(tick_once(&manager, None), TickReport::default());
        assert_eq!(manager.len(), 1);
    }
}
