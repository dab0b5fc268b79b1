use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use assert_matches::assert_matches;
use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};
use uuid::Uuid;

use appointment_cell::models::CreateAppointmentRequest;
use appointment_cell::{
    Appointment, AppointmentError, AppointmentLifecycleService, AppointmentStatus,
    AppointmentStore,
};
use task_queue_cell::{TaskHandle, TaskPayload, TaskQueueError, TaskScheduler};
use video_room_cell::{RoomProvider, RoomProviderError, RoomRole};

// ---------------------------------------------------------------------------
// In-memory fakes for the injected collaborators
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq)]
enum SchedulerOp {
    Scheduled {
        task_id: Uuid,
        payload: TaskPayload,
        fire_at: DateTime<Utc>,
    },
    Cancelled {
        task_id: Uuid,
        terminate: bool,
    },
}

#[derive(Default)]
struct FakeScheduler {
    ops: Mutex<Vec<SchedulerOp>>,
    fail_schedule: AtomicBool,
}

impl FakeScheduler {
    fn ops(&self) -> Vec<SchedulerOp> {
        self.ops.lock().unwrap().clone()
    }

    fn scheduled(&self) -> Vec<(Uuid, TaskPayload, DateTime<Utc>)> {
        self.ops()
            .into_iter()
            .filter_map(|op| match op {
                SchedulerOp::Scheduled {
                    task_id,
                    payload,
                    fire_at,
                } => Some((task_id, payload, fire_at)),
                _ => None,
            })
            .collect()
    }

    fn cancelled(&self) -> Vec<(Uuid, bool)> {
        self.ops()
            .into_iter()
            .filter_map(|op| match op {
                SchedulerOp::Cancelled { task_id, terminate } => Some((task_id, terminate)),
                _ => None,
            })
            .collect()
    }

    /// Task ids scheduled and not since cancelled.
    fn live_task_ids(&self) -> Vec<Uuid> {
        let cancelled: HashSet<Uuid> = self.cancelled().into_iter().map(|(id, _)| id).collect();
        self.scheduled()
            .into_iter()
            .map(|(id, _, _)| id)
            .filter(|id| !cancelled.contains(id))
            .collect()
    }
}

#[async_trait]
impl TaskScheduler for FakeScheduler {
    async fn schedule(
        &self,
        payload: TaskPayload,
        fire_at: DateTime<Utc>,
    ) -> Result<TaskHandle, TaskQueueError> {
        if self.fail_schedule.load(Ordering::SeqCst) {
            return Err(TaskQueueError::Pool("scheduler unavailable".to_string()));
        }

        let task_id = Uuid::new_v4();
        self.ops.lock().unwrap().push(SchedulerOp::Scheduled {
            task_id,
            payload,
            fire_at,
        });
        Ok(TaskHandle { task_id })
    }

    async fn cancel(&self, handle: &TaskHandle, terminate: bool) -> Result<(), TaskQueueError> {
        self.ops.lock().unwrap().push(SchedulerOp::Cancelled {
            task_id: handle.task_id,
            terminate,
        });
        Ok(())
    }
}

#[derive(Default)]
struct FakeRoomProvider {
    counter: AtomicUsize,
    disable_calls: Mutex<Vec<String>>,
    fail_create: AtomicBool,
    fail_links: AtomicBool,
}

impl FakeRoomProvider {
    fn disable_calls(&self) -> Vec<String> {
        self.disable_calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl RoomProvider for FakeRoomProvider {
    async fn create_room(
        &self,
        _name: &str,
        _description: &str,
    ) -> Result<String, RoomProviderError> {
        if self.fail_create.load(Ordering::SeqCst) {
            return Err(RoomProviderError::ApiError {
                status: 503,
                message: "provider down".to_string(),
            });
        }
        let n = self.counter.fetch_add(1, Ordering::SeqCst);
        Ok(format!("room-{}", n))
    }

    async fn issue_join_link(
        &self,
        room_id: &str,
        role: RoomRole,
    ) -> Result<String, RoomProviderError> {
        if self.fail_links.load(Ordering::SeqCst) {
            return Err(RoomProviderError::ApiError {
                status: 503,
                message: "provider down".to_string(),
            });
        }
        Ok(format!(
            "https://webdoctor-test.app.100ms.live/meeting/{}-{}",
            room_id, role
        ))
    }

    async fn disable_room(&self, room_id: &str) -> Result<bool, RoomProviderError> {
        self.disable_calls.lock().unwrap().push(room_id.to_string());
        Ok(false)
    }
}

#[derive(Default)]
struct InMemoryStore {
    appointments: Mutex<HashMap<Uuid, Appointment>>,
    doctors: Mutex<HashSet<Uuid>>,
    patients: Mutex<HashSet<Uuid>>,
    connections: Mutex<HashSet<(Uuid, Uuid)>>,
    fail_insert: AtomicBool,
}

impl InMemoryStore {
    fn stored(&self, id: Uuid) -> Option<Appointment> {
        self.appointments.lock().unwrap().get(&id).cloned()
    }

    fn count(&self) -> usize {
        self.appointments.lock().unwrap().len()
    }
}

#[async_trait]
impl AppointmentStore for InMemoryStore {
    async fn insert(&self, appointment: &Appointment) -> Result<(), AppointmentError> {
        if self.fail_insert.load(Ordering::SeqCst) {
            return Err(AppointmentError::Storage("insert failed".to_string()));
        }
        self.appointments
            .lock()
            .unwrap()
            .insert(appointment.id, appointment.clone());
        Ok(())
    }

    async fn update(&self, appointment: &Appointment) -> Result<(), AppointmentError> {
        let mut appointments = self.appointments.lock().unwrap();
        if !appointments.contains_key(&appointment.id) {
            return Err(AppointmentError::NotFound);
        }
        appointments.insert(appointment.id, appointment.clone());
        Ok(())
    }

    async fn fetch(&self, appointment_id: Uuid) -> Result<Appointment, AppointmentError> {
        self.stored(appointment_id).ok_or(AppointmentError::NotFound)
    }

    async fn list_for_doctor(
        &self,
        doctor_id: Uuid,
        status: Option<AppointmentStatus>,
    ) -> Result<Vec<Appointment>, AppointmentError> {
        Ok(self
            .appointments
            .lock()
            .unwrap()
            .values()
            .filter(|a| a.doctor_id == doctor_id)
            .filter(|a| status.map_or(true, |s| a.status == s))
            .cloned()
            .collect())
    }

    async fn list_for_patient(
        &self,
        patient_id: Uuid,
        status: Option<AppointmentStatus>,
    ) -> Result<Vec<Appointment>, AppointmentError> {
        Ok(self
            .appointments
            .lock()
            .unwrap()
            .values()
            .filter(|a| a.patient_id == patient_id)
            .filter(|a| status.map_or(true, |s| a.status == s))
            .cloned()
            .collect())
    }

    async fn doctor_exists(&self, doctor_id: Uuid) -> Result<bool, AppointmentError> {
        Ok(self.doctors.lock().unwrap().contains(&doctor_id))
    }

    async fn patient_exists(&self, patient_id: Uuid) -> Result<bool, AppointmentError> {
        Ok(self.patients.lock().unwrap().contains(&patient_id))
    }

    async fn are_connected(
        &self,
        doctor_id: Uuid,
        patient_id: Uuid,
    ) -> Result<bool, AppointmentError> {
        Ok(self
            .connections
            .lock()
            .unwrap()
            .contains(&(doctor_id, patient_id)))
    }
}

// ---------------------------------------------------------------------------
// Fixture
// ---------------------------------------------------------------------------

struct Fixture {
    store: Arc<InMemoryStore>,
    rooms: Arc<FakeRoomProvider>,
    scheduler: Arc<FakeScheduler>,
    lifecycle: AppointmentLifecycleService,
    doctor_id: Uuid,
    patient_id: Uuid,
}

impl Fixture {
    fn new() -> Self {
        let store = Arc::new(InMemoryStore::default());
        let rooms = Arc::new(FakeRoomProvider::default());
        let scheduler = Arc::new(FakeScheduler::default());

        let doctor_id = Uuid::new_v4();
        let patient_id = Uuid::new_v4();
        store.doctors.lock().unwrap().insert(doctor_id);
        store.patients.lock().unwrap().insert(patient_id);
        store
            .connections
            .lock()
            .unwrap()
            .insert((doctor_id, patient_id));

        let lifecycle = AppointmentLifecycleService::new(
            store.clone(),
            rooms.clone(),
            scheduler.clone(),
        );

        Self {
            store,
            rooms,
            scheduler,
            lifecycle,
            doctor_id,
            patient_id,
        }
    }

    fn request_at(&self, date_time: DateTime<Utc>) -> CreateAppointmentRequest {
        CreateAppointmentRequest {
            doctor_id: self.doctor_id,
            patient_id: self.patient_id,
            date_time,
            description: Some("Follow-up".to_string()),
        }
    }

    async fn create_at(&self, date_time: DateTime<Utc>) -> Appointment {
        self.lifecycle
            .create(self.request_at(date_time))
            .await
            .expect("create should succeed")
    }
}

fn ten_am() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 1, 1, 10, 0, 0).unwrap()
}

fn eleven_am() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 1, 1, 11, 0, 0).unwrap()
}

// ---------------------------------------------------------------------------
// Creation
// ---------------------------------------------------------------------------

#[tokio::test]
async fn create_schedules_completion_thirty_minutes_after_start() {
    let fx = Fixture::new();

    let appointment = fx.create_at(ten_am()).await;

    assert_eq!(appointment.status, AppointmentStatus::Scheduled);
    assert!(!appointment.room_id.is_empty());
    assert!(appointment.room_name.starts_with("WebDoctor-Appointment-"));
    assert_ne!(appointment.doctor_join_url, appointment.patient_join_url);

    let scheduled = fx.scheduler.scheduled();
    assert_eq!(scheduled.len(), 1);
    let (task_id, payload, fire_at) = &scheduled[0];
    assert_eq!(
        *fire_at,
        Utc.with_ymd_and_hms(2025, 1, 1, 10, 30, 0).unwrap()
    );
    assert_eq!(
        *payload,
        TaskPayload::CompleteAppointment {
            room_id: appointment.room_id.clone(),
            appointment_id: appointment.id,
        }
    );
    assert_eq!(appointment.task_id, Some(*task_id));

    let stored = fx.store.stored(appointment.id).unwrap();
    assert_eq!(stored.task_id, Some(*task_id));
}

#[tokio::test]
async fn create_fails_when_room_creation_fails_and_persists_nothing() {
    let fx = Fixture::new();
    fx.rooms.fail_create.store(true, Ordering::SeqCst);

    let result = fx.lifecycle.create(fx.request_at(ten_am())).await;

    assert_matches!(result, Err(AppointmentError::Provider(_)));
    assert_eq!(fx.store.count(), 0);
    assert!(fx.scheduler.ops().is_empty());
}

#[tokio::test]
async fn create_tears_down_room_when_link_issuance_fails() {
    let fx = Fixture::new();
    fx.rooms.fail_links.store(true, Ordering::SeqCst);

    let result = fx.lifecycle.create(fx.request_at(ten_am())).await;

    assert_matches!(result, Err(AppointmentError::Provider(_)));
    assert_eq!(fx.store.count(), 0);
    assert_eq!(fx.rooms.disable_calls().len(), 1);
}

#[tokio::test]
async fn create_tears_down_room_when_insert_fails() {
    let fx = Fixture::new();
    fx.store.fail_insert.store(true, Ordering::SeqCst);

    let result = fx.lifecycle.create(fx.request_at(ten_am())).await;

    assert_matches!(result, Err(AppointmentError::Storage(_)));
    assert_eq!(fx.rooms.disable_calls(), vec!["room-0".to_string()]);
    assert!(fx.scheduler.ops().is_empty());
}

#[tokio::test]
async fn create_compensates_when_scheduling_fails() {
    let fx = Fixture::new();
    fx.scheduler.fail_schedule.store(true, Ordering::SeqCst);

    let result = fx.lifecycle.create(fx.request_at(ten_am())).await;

    assert_matches!(result, Err(AppointmentError::Scheduling(_)));
    assert_eq!(fx.rooms.disable_calls().len(), 1);

    // The persisted appointment is not left bookable.
    let stored: Vec<Appointment> = fx
        .store
        .list_for_doctor(fx.doctor_id, None)
        .await
        .unwrap();
    assert_eq!(stored.len(), 1);
    assert_eq!(stored[0].status, AppointmentStatus::Cancelled);
}

#[tokio::test]
async fn create_requires_connected_doctor_and_patient() {
    let fx = Fixture::new();
    fx.store.connections.lock().unwrap().clear();

    let result = fx.lifecycle.create(fx.request_at(ten_am())).await;

    assert_matches!(result, Err(AppointmentError::NotConnected));
    assert_eq!(fx.store.count(), 0);
}

#[tokio::test]
async fn create_requires_existing_doctor() {
    let fx = Fixture::new();
    let mut request = fx.request_at(ten_am());
    request.doctor_id = Uuid::new_v4();

    assert_matches!(
        fx.lifecycle.create(request).await,
        Err(AppointmentError::DoctorNotFound)
    );
}

// ---------------------------------------------------------------------------
// Rescheduling
// ---------------------------------------------------------------------------

#[tokio::test]
async fn reschedule_moves_completion_task_and_keeps_room() {
    let fx = Fixture::new();
    let created = fx.create_at(ten_am()).await;
    let original_task = created.task_id.unwrap();

    let rescheduled = fx
        .lifecycle
        .reschedule(created.id, eleven_am())
        .await
        .unwrap();

    // Room and links are assigned once and never regenerated.
    assert_eq!(rescheduled.room_id, created.room_id);
    assert_eq!(rescheduled.room_name, created.room_name);
    assert_eq!(rescheduled.doctor_join_url, created.doctor_join_url);
    assert_eq!(rescheduled.patient_join_url, created.patient_join_url);

    assert_eq!(rescheduled.date_time, eleven_am());
    assert_ne!(rescheduled.task_id, Some(original_task));

    // Old task is cancelled with terminate semantics before the new one is
    // scheduled.
    let ops = fx.scheduler.ops();
    assert_eq!(ops.len(), 3);
    assert_matches!(
        &ops[1],
        SchedulerOp::Cancelled { task_id, terminate: true } if *task_id == original_task
    );
    assert_matches!(
        &ops[2],
        SchedulerOp::Scheduled { fire_at, .. }
            if *fire_at == Utc.with_ymd_and_hms(2025, 1, 1, 11, 30, 0).unwrap()
    );
}

#[tokio::test]
async fn reschedule_to_same_time_causes_no_task_churn() {
    let fx = Fixture::new();
    let created = fx.create_at(ten_am()).await;
    let ops_before = fx.scheduler.ops().len();

    let unchanged = fx.lifecycle.reschedule(created.id, ten_am()).await.unwrap();

    assert_eq!(unchanged.task_id, created.task_id);
    assert_eq!(fx.scheduler.ops().len(), ops_before);
}

#[tokio::test]
async fn repeated_reschedules_leave_a_single_live_task() {
    let fx = Fixture::new();
    let created = fx.create_at(ten_am()).await;

    let mut when = eleven_am();
    for _ in 0..3 {
        fx.lifecycle.reschedule(created.id, when).await.unwrap();
        when = when + chrono::Duration::hours(1);
    }

    let live = fx.scheduler.live_task_ids();
    assert_eq!(live.len(), 1);

    let stored = fx.store.stored(created.id).unwrap();
    assert_eq!(stored.task_id, Some(live[0]));
}

#[tokio::test]
async fn reschedule_of_unknown_appointment_is_not_found() {
    let fx = Fixture::new();

    assert_matches!(
        fx.lifecycle.reschedule(Uuid::new_v4(), eleven_am()).await,
        Err(AppointmentError::NotFound)
    );
}

#[tokio::test]
async fn reschedule_of_cancelled_appointment_is_rejected() {
    let fx = Fixture::new();
    let created = fx.create_at(ten_am()).await;
    fx.lifecycle.cancel(created.id).await.unwrap();

    assert_matches!(
        fx.lifecycle.reschedule(created.id, eleven_am()).await,
        Err(AppointmentError::AlreadyTerminal(AppointmentStatus::Cancelled))
    );
}

// ---------------------------------------------------------------------------
// Cancellation
// ---------------------------------------------------------------------------

#[tokio::test]
async fn cancel_finalizes_status_and_tears_down_room() {
    let fx = Fixture::new();
    let created = fx.create_at(ten_am()).await;
    let task_id = created.task_id.unwrap();

    let cancelled = fx.lifecycle.cancel(created.id).await.unwrap();

    assert_eq!(cancelled.status, AppointmentStatus::Cancelled);
    assert_eq!(cancelled.task_id, None);
    assert_eq!(fx.scheduler.cancelled(), vec![(task_id, true)]);

    // Teardown goes through the deferred queue, decoupled from the cancel.
    let teardowns: Vec<_> = fx
        .scheduler
        .scheduled()
        .into_iter()
        .filter(|(_, payload, _)| {
            matches!(payload, TaskPayload::DisableRoom { room_id } if *room_id == created.room_id)
        })
        .collect();
    assert_eq!(teardowns.len(), 1);
}

#[tokio::test]
async fn cancel_twice_reports_already_terminal() {
    let fx = Fixture::new();
    let created = fx.create_at(ten_am()).await;

    fx.lifecycle.cancel(created.id).await.unwrap();
    let second = fx.lifecycle.cancel(created.id).await;

    assert_matches!(
        second,
        Err(AppointmentError::AlreadyTerminal(AppointmentStatus::Cancelled))
    );
    assert_eq!(
        fx.store.stored(created.id).unwrap().status,
        AppointmentStatus::Cancelled
    );
}

#[tokio::test]
async fn cancel_falls_back_to_direct_teardown_when_queue_is_down() {
    let fx = Fixture::new();
    let created = fx.create_at(ten_am()).await;

    fx.scheduler.fail_schedule.store(true, Ordering::SeqCst);
    let cancelled = fx.lifecycle.cancel(created.id).await.unwrap();
    assert_eq!(cancelled.status, AppointmentStatus::Cancelled);

    // The spawned direct disable call lands shortly after.
    tokio::task::yield_now().await;
    tokio::time::sleep(std::time::Duration::from_millis(50)).await;
    assert_eq!(fx.rooms.disable_calls(), vec![created.room_id.clone()]);
}

// ---------------------------------------------------------------------------
// Completion fire
// ---------------------------------------------------------------------------

#[tokio::test]
async fn completion_fire_completes_scheduled_appointment() {
    let fx = Fixture::new();
    let created = fx.create_at(ten_am()).await;

    fx.lifecycle
        .on_completion_fire(&created.room_id, created.id)
        .await
        .unwrap();

    let stored = fx.store.stored(created.id).unwrap();
    assert_eq!(stored.status, AppointmentStatus::Completed);
    assert_eq!(stored.task_id, None);
    assert_eq!(fx.rooms.disable_calls(), vec![created.room_id.clone()]);
}

#[tokio::test]
async fn completion_fire_after_cancel_leaves_cancelled_status() {
    let fx = Fixture::new();
    let created = fx.create_at(ten_am()).await;
    fx.lifecycle.cancel(created.id).await.unwrap();

    fx.lifecycle
        .on_completion_fire(&created.room_id, created.id)
        .await
        .unwrap();

    assert_eq!(
        fx.store.stored(created.id).unwrap().status,
        AppointmentStatus::Cancelled
    );
}

#[tokio::test]
async fn completion_fire_is_idempotent() {
    let fx = Fixture::new();
    let created = fx.create_at(ten_am()).await;

    fx.lifecycle
        .on_completion_fire(&created.room_id, created.id)
        .await
        .unwrap();
    fx.lifecycle
        .on_completion_fire(&created.room_id, created.id)
        .await
        .unwrap();

    assert_eq!(
        fx.store.stored(created.id).unwrap().status,
        AppointmentStatus::Completed
    );
}

#[tokio::test]
async fn completion_fire_for_missing_appointment_is_harmless() {
    let fx = Fixture::new();

    let result = fx
        .lifecycle
        .on_completion_fire("room-gone", Uuid::new_v4())
        .await;

    assert!(result.is_ok());
    assert_eq!(fx.rooms.disable_calls(), vec!["room-gone".to_string()]);
}
