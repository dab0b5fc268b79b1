use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use tracing::{debug, error, info, instrument, warn};
use uuid::Uuid;

use task_queue_cell::{TaskHandle, TaskPayload, TaskScheduler};
use video_room_cell::{RoomProvider, RoomRole};

use crate::models::{
    Appointment, AppointmentError, AppointmentStatus, CreateAppointmentRequest,
};
use crate::store::AppointmentStore;

/// Minutes past the scheduled visit start after which the completion task
/// fires and the appointment auto-completes.
const COMPLETION_DELAY_MINUTES: i64 = 30;

/// Owns the appointment state machine and coordinates the room provider and
/// the deferred task scheduler.
///
/// Every scheduled appointment has a live room and valid join links, and
/// exactly one completion event (task fire or manual cancel) finalizes it.
/// All collaborators are injected, so tests run against in-memory fakes.
pub struct AppointmentLifecycleService {
    store: Arc<dyn AppointmentStore>,
    rooms: Arc<dyn RoomProvider>,
    scheduler: Arc<dyn TaskScheduler>,
}

impl AppointmentLifecycleService {
    pub fn new(
        store: Arc<dyn AppointmentStore>,
        rooms: Arc<dyn RoomProvider>,
        scheduler: Arc<dyn TaskScheduler>,
    ) -> Self {
        Self {
            store,
            rooms,
            scheduler,
        }
    }

    /// Book a visit: provision a room with per-role join links, persist the
    /// appointment, and schedule its deferred completion.
    ///
    /// Provider failures leave nothing persisted. If persistence or
    /// scheduling fails after the room exists, the room is torn down on a
    /// best-effort basis before the error surfaces.
    #[instrument(skip(self, request), fields(doctor_id = %request.doctor_id, patient_id = %request.patient_id))]
    pub async fn create(
        &self,
        request: CreateAppointmentRequest,
    ) -> Result<Appointment, AppointmentError> {
        if !self.store.doctor_exists(request.doctor_id).await? {
            return Err(AppointmentError::DoctorNotFound);
        }
        if !self.store.patient_exists(request.patient_id).await? {
            return Err(AppointmentError::PatientNotFound);
        }
        if !self
            .store
            .are_connected(request.doctor_id, request.patient_id)
            .await?
        {
            return Err(AppointmentError::NotConnected);
        }

        let room_name = generate_room_name();
        let description = request.description.clone().unwrap_or_default();

        let room_id = self.rooms.create_room(&room_name, &description).await?;

        let doctor_join_url = match self.rooms.issue_join_link(&room_id, RoomRole::Host).await {
            Ok(url) => url,
            Err(e) => {
                self.best_effort_disable_room(&room_id, "host link issuance failed")
                    .await;
                return Err(e.into());
            }
        };
        let patient_join_url = match self.rooms.issue_join_link(&room_id, RoomRole::Guest).await {
            Ok(url) => url,
            Err(e) => {
                self.best_effort_disable_room(&room_id, "guest link issuance failed")
                    .await;
                return Err(e.into());
            }
        };

        let now = Utc::now();
        let mut appointment = Appointment {
            id: Uuid::new_v4(),
            doctor_id: request.doctor_id,
            patient_id: request.patient_id,
            date_time: request.date_time,
            status: AppointmentStatus::Scheduled,
            room_id: room_id.clone(),
            room_name,
            doctor_join_url,
            patient_join_url,
            description: request.description,
            task_id: None,
            created_at: now,
            updated_at: now,
        };

        if let Err(e) = self.store.insert(&appointment).await {
            self.best_effort_disable_room(&room_id, "appointment insert failed")
                .await;
            return Err(e);
        }

        let fire_at = request.date_time + Duration::minutes(COMPLETION_DELAY_MINUTES);
        let payload = TaskPayload::CompleteAppointment {
            room_id: room_id.clone(),
            appointment_id: appointment.id,
        };
        let handle = match self.scheduler.schedule(payload, fire_at).await {
            Ok(handle) => handle,
            Err(e) => {
                // The appointment can never auto-complete; take it back out
                // of the bookable state before surfacing the error.
                appointment.status = AppointmentStatus::Cancelled;
                appointment.updated_at = Utc::now();
                if let Err(persist_err) = self.store.update(&appointment).await {
                    error!(
                        "Failed to cancel appointment {} after scheduling failure: {}",
                        appointment.id, persist_err
                    );
                }
                self.best_effort_disable_room(&room_id, "completion scheduling failed")
                    .await;
                return Err(e.into());
            }
        };

        appointment.task_id = Some(handle.task_id);
        appointment.updated_at = Utc::now();
        if let Err(e) = self.store.update(&appointment).await {
            if let Err(cancel_err) = self.scheduler.cancel(&handle, false).await {
                warn!(
                    "Failed to cancel task {} after handle persistence failure: {}",
                    handle.task_id, cancel_err
                );
            }
            return Err(e);
        }

        info!(
            "Created appointment {} in room {} firing completion at {}",
            appointment.id, appointment.room_id, fire_at
        );
        Ok(appointment)
    }

    /// Move the visit to a new time. The room and join links are never
    /// regenerated; only the completion task moves. Rescheduling to the
    /// stored date-time is a no-op with respect to task scheduling.
    #[instrument(skip(self))]
    pub async fn reschedule(
        &self,
        appointment_id: Uuid,
        new_date_time: DateTime<Utc>,
    ) -> Result<Appointment, AppointmentError> {
        let mut appointment = self.store.fetch(appointment_id).await?;
        if appointment.status.is_terminal() {
            return Err(AppointmentError::AlreadyTerminal(appointment.status));
        }

        if appointment.date_time == new_date_time {
            debug!(
                "Appointment {} already at {}; no task churn",
                appointment_id, new_date_time
            );
            return Ok(appointment);
        }

        // Drop the old task before scheduling its replacement so two live
        // tasks never reference the same appointment.
        if let Some(task_id) = appointment.task_id {
            self.scheduler.cancel(&TaskHandle { task_id }, true).await?;
        }

        let fire_at = new_date_time + Duration::minutes(COMPLETION_DELAY_MINUTES);
        let payload = TaskPayload::CompleteAppointment {
            room_id: appointment.room_id.clone(),
            appointment_id,
        };
        let handle = self.scheduler.schedule(payload, fire_at).await?;

        appointment.date_time = new_date_time;
        appointment.task_id = Some(handle.task_id);
        appointment.updated_at = Utc::now();
        self.store.update(&appointment).await?;

        info!(
            "Rescheduled appointment {} to {}; completion fires at {}",
            appointment_id, new_date_time, fire_at
        );
        Ok(appointment)
    }

    /// Cancel the visit: drop the pending completion task, finalize the
    /// cancelled status, then tear the room down without blocking on it.
    #[instrument(skip(self))]
    pub async fn cancel(&self, appointment_id: Uuid) -> Result<Appointment, AppointmentError> {
        let mut appointment = self.store.fetch(appointment_id).await?;
        if appointment.status.is_terminal() {
            return Err(AppointmentError::AlreadyTerminal(appointment.status));
        }

        if let Some(task_id) = appointment.task_id {
            self.scheduler.cancel(&TaskHandle { task_id }, true).await?;
        }

        appointment.status = AppointmentStatus::Cancelled;
        appointment.task_id = None;
        appointment.updated_at = Utc::now();
        self.store.update(&appointment).await?;

        // Room teardown is fire-and-forget: the cancellation is already
        // final whatever happens to the room.
        let teardown = TaskPayload::DisableRoom {
            room_id: appointment.room_id.clone(),
        };
        if let Err(e) = self.scheduler.schedule(teardown, Utc::now()).await {
            warn!(
                "Failed to enqueue room teardown for appointment {}: {}; disabling directly",
                appointment_id, e
            );
            let rooms = Arc::clone(&self.rooms);
            let room_id = appointment.room_id.clone();
            tokio::spawn(async move {
                if let Err(e) = rooms.disable_room(&room_id).await {
                    error!("Direct room teardown for {} failed: {}", room_id, e);
                }
            });
        }

        info!("Cancelled appointment {}", appointment_id);
        Ok(appointment)
    }

    /// Invoked by the task worker when the completion task fires.
    ///
    /// Disables the room, then completes the appointment only if it is
    /// still scheduled. A concurrent cancellation wins whichever write
    /// committed first; the loser observes the terminal status here and
    /// does nothing. Disabling an already-disabled room is a provider-side
    /// no-op.
    #[instrument(skip(self))]
    pub async fn on_completion_fire(
        &self,
        room_id: &str,
        appointment_id: Uuid,
    ) -> Result<(), AppointmentError> {
        if let Err(e) = self.rooms.disable_room(room_id).await {
            warn!(
                "Failed to disable room {} while completing appointment {}: {}",
                room_id, appointment_id, e
            );
        }

        let mut appointment = match self.store.fetch(appointment_id).await {
            Ok(appointment) => appointment,
            Err(AppointmentError::NotFound) => {
                warn!(
                    "Completion fired for missing appointment {}; nothing to do",
                    appointment_id
                );
                return Ok(());
            }
            Err(e) => return Err(e),
        };

        if appointment.status != AppointmentStatus::Scheduled {
            debug!(
                "Appointment {} is already {}; completion fire is a no-op",
                appointment_id, appointment.status
            );
            return Ok(());
        }

        appointment.status = AppointmentStatus::Completed;
        appointment.task_id = None;
        appointment.updated_at = Utc::now();
        self.store.update(&appointment).await?;

        info!("Completed appointment {}", appointment_id);
        Ok(())
    }

    /// Room teardown requested by a cancelled appointment's deferred task.
    pub async fn disable_room_cleanup(&self, room_id: &str) -> Result<(), AppointmentError> {
        self.rooms.disable_room(room_id).await?;
        Ok(())
    }

    pub async fn get(&self, appointment_id: Uuid) -> Result<Appointment, AppointmentError> {
        self.store.fetch(appointment_id).await
    }

    pub async fn list_for_doctor(
        &self,
        doctor_id: Uuid,
        status: Option<AppointmentStatus>,
    ) -> Result<Vec<Appointment>, AppointmentError> {
        self.store.list_for_doctor(doctor_id, status).await
    }

    pub async fn list_for_patient(
        &self,
        patient_id: Uuid,
        status: Option<AppointmentStatus>,
    ) -> Result<Vec<Appointment>, AppointmentError> {
        self.store.list_for_patient(patient_id, status).await
    }

    async fn best_effort_disable_room(&self, room_id: &str, context: &str) {
        if let Err(e) = self.rooms.disable_room(room_id).await {
            warn!(
                "Compensating room teardown for {} failed ({}): {}",
                room_id, context, e
            );
        }
    }
}

fn generate_room_name() -> String {
    let suffix = Uuid::new_v4().simple().to_string()[..10].to_uppercase();
    format!("WebDoctor-Appointment-{}", suffix)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn room_names_are_prefixed_and_unique() {
        let a = generate_room_name();
        let b = generate_room_name();

        assert!(a.starts_with("WebDoctor-Appointment-"));
        assert_eq!(a.len(), "WebDoctor-Appointment-".len() + 10);
        assert_ne!(a, b);
    }
}
