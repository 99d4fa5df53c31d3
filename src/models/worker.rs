use serde::{Deserialize, Serialize};

/// Field worker roster entry. Workers are an ad hoc dataset seeded at
/// startup and held in process state, not persisted through the report
/// store.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FieldWorker {
    pub id: String,
    pub name: String,
    pub email: String,
    pub status: WorkerStatus,
    pub assigned_tasks: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WorkerStatus {
    Available,
    Busy,
}

pub fn default_roster() -> Vec<FieldWorker> {
    vec![
        FieldWorker {
            id: "1".into(),
            name: "John".into(),
            email: "ssr@city.gov".into(),
            status: WorkerStatus::Available,
            assigned_tasks: 2,
        },
        FieldWorker {
            id: "2".into(),
            name: "Sarah".into(),
            email: "abdh@city.gov".into(),
            status: WorkerStatus::Busy,
            assigned_tasks: 5,
        },
        FieldWorker {
            id: "3".into(),
            name: "Mike".into(),
            email: "kum@city.gov".into(),
            status: WorkerStatus::Available,
            assigned_tasks: 1,
        },
    ]
}
