use dronenet_shared::models::{MissionCommitted, MissionRecord};
use dronenet_shared::planner::MissionSink;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

/// Oldest missions are dropped once the log holds this many.
pub const DEFAULT_CAPACITY: usize = 500;

/// Missions committed since the server started. Nothing is persisted.
pub struct MissionLog {
    records: Mutex<VecDeque<MissionRecord>>,
    capacity: usize,
}

impl MissionLog {
    pub fn new(capacity: usize) -> Arc<Self> {
        Arc::new(MissionLog {
            records: Mutex::new(VecDeque::new()),
            capacity: capacity.max(1),
        })
    }

    pub fn record(&self, mission: &MissionCommitted) -> Result<MissionRecord, String> {
        let record = MissionRecord {
            id: uuid::Uuid::new_v4(),
            committed_at: chrono::Utc::now().to_rfc3339(),
            mission: mission.clone(),
        };
        let mut records = self.records.lock().map_err(|e| e.to_string())?;
        if records.len() == self.capacity {
            records.pop_front();
        }
        records.push_back(record.clone());
        Ok(record)
    }

    /// Most recent first.
    pub fn recent(&self, limit: usize) -> Result<Vec<MissionRecord>, String> {
        let records = self.records.lock().map_err(|e| e.to_string())?;
        Ok(records.iter().rev().take(limit).cloned().collect())
    }

    pub fn for_drone(&self, drone_id: &str) -> Result<Vec<MissionRecord>, String> {
        let records = self.records.lock().map_err(|e| e.to_string())?;
        Ok(records
            .iter()
            .rev()
            .filter(|r| r.mission.drone_id == drone_id)
            .cloned()
            .collect())
    }
}

/// Sink that appends committed missions to the log and keeps the stored
/// record so the caller can return it.
pub struct LogSink<'a> {
    log: &'a MissionLog,
    pub stored: Option<MissionRecord>,
}

impl<'a> LogSink<'a> {
    pub fn new(log: &'a MissionLog) -> Self {
        LogSink { log, stored: None }
    }
}

impl MissionSink for LogSink<'_> {
    fn mission_committed(&mut self, event: &MissionCommitted) -> Result<(), String> {
        self.stored = Some(self.log.record(event)?);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use dronenet_shared::models::{GeoPoint, MissionEstimate};

    fn mission(drone: &str) -> MissionCommitted {
        MissionCommitted {
            drone_id: drone.to_string(),
            start: GeoPoint::new(40.7831, -73.9712),
            end: GeoPoint::new(40.7505, -73.9934),
            station_id: None,
            estimate: MissionEstimate {
                distance_km: 4.08,
                eta_minutes: 11.6,
                battery_used_pct: 33.4,
                cost_usd: 0.0,
                feasible: true,
            },
        }
    }

    #[test]
    fn test_record_assigns_id_and_timestamp() {
        let log = MissionLog::new(DEFAULT_CAPACITY);
        let a = log.record(&mission("drone-1")).unwrap();
        let b = log.record(&mission("drone-1")).unwrap();
        assert_ne!(a.id, b.id);
        assert!(chrono::DateTime::parse_from_rfc3339(&a.committed_at).is_ok());
        assert_eq!(log.recent(usize::MAX).unwrap().len(), 2);
    }

    #[test]
    fn test_recent_is_newest_first() {
        let log = MissionLog::new(DEFAULT_CAPACITY);
        log.record(&mission("drone-1")).unwrap();
        log.record(&mission("drone-3")).unwrap();
        let recent = log.recent(10).unwrap();
        assert_eq!(recent[0].mission.drone_id, "drone-3");
        assert_eq!(log.recent(1).unwrap().len(), 1);
        assert_eq!(log.for_drone("drone-1").unwrap().len(), 1);
    }

    #[test]
    fn test_capacity_drops_oldest() {
        let log = MissionLog::new(2);
        log.record(&mission("drone-1")).unwrap();
        log.record(&mission("drone-2")).unwrap();
        log.record(&mission("drone-3")).unwrap();
        assert_eq!(log.recent(usize::MAX).unwrap().len(), 2);
        assert!(log.for_drone("drone-1").unwrap().is_empty());
    }

    #[test]
    fn test_log_as_mission_sink() {
        let log = MissionLog::new(DEFAULT_CAPACITY);
        let mut sink = LogSink::new(&log);
        sink.mission_committed(&mission("drone-1")).unwrap();
        let stored = sink.stored.unwrap();
        assert_eq!(log.recent(1).unwrap()[0].id, stored.id);
    }
}
