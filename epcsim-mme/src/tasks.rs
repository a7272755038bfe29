//! MME Task Framework
//!
//! Actor-based task model with message passing for the MME. The EMM task
//! runs as an independent async task owning the EMM layer; every NAS event
//! (procedure initiation, UE responses, aborts) arrives as a message on its
//! channel, and a periodic tick drives the retransmission timers. One queue
//! per layer means all events for a UE are handled in arrival order.

use tokio::sync::mpsc;
use tracing::{debug, error, info};

use epcsim_common::types::UeId;
use epcsim_common::MmeConfig;

use crate::emm::{
    ChannelSapDispatch, EmmLayer, EmmSapPrimitive, IdentityType, MobileIdentity,
    ProcedureCallbacks,
};

// ============================================================================
// Task Message Envelope
// ============================================================================

/// Task message envelope wrapping typed messages with control signals.
#[derive(Debug)]
pub enum TaskMessage<T> {
    /// Regular message payload
    Message(T),
    /// Shutdown signal - task should terminate gracefully
    Shutdown,
}

impl<T> TaskMessage<T> {
    /// Creates a new message envelope containing the given payload.
    pub fn message(msg: T) -> Self {
        TaskMessage::Message(msg)
    }

    /// Creates a shutdown signal.
    pub fn shutdown() -> Self {
        TaskMessage::Shutdown
    }

    /// Returns true if this is a shutdown signal.
    pub fn is_shutdown(&self) -> bool {
        matches!(self, TaskMessage::Shutdown)
    }

    /// Returns the message payload if present, or None for shutdown.
    pub fn into_message(self) -> Option<T> {
        match self {
            TaskMessage::Message(msg) => Some(msg),
            TaskMessage::Shutdown => None,
        }
    }
}

// ============================================================================
// Task Trait
// ============================================================================

/// Base trait for MME tasks.
///
/// Tasks are async actors that process messages from their receive channel
/// until a shutdown signal arrives.
#[async_trait::async_trait]
pub trait Task: Send + 'static {
    /// The message type this task processes.
    type Message: Send;

    /// Runs the task's main loop, processing messages until shutdown.
    async fn run(&mut self, rx: mpsc::Receiver<TaskMessage<Self::Message>>);
}

// ============================================================================
// EMM Task Messages
// ============================================================================

/// Messages for the EMM task.
#[derive(Debug)]
pub enum EmmMessage {
    /// A UE established a signalling connection; admit it.
    AdmitUe {
        /// Lower-layer assigned UE identifier
        ue_id: UeId,
    },
    /// The signalling connection for a UE was released.
    ReleaseUe {
        /// UE to release
        ue_id: UeId,
    },
    /// An owning procedure requests identification of a UE.
    InitiateIdentification {
        /// Target UE
        ue_id: UeId,
        /// Identity parameter to request
        identity_type: IdentityType,
    },
    /// Identity Response received from the UE.
    IdentityResponse {
        /// Responding UE
        ue_id: UeId,
        /// Disclosed identity
        identity: MobileIdentity,
    },
    /// An owning procedure tears down its common procedure.
    AbortProcedure {
        /// UE whose procedure is torn down
        ue_id: UeId,
    },
}

// ============================================================================
// Task Handle
// ============================================================================

/// Handle for sending messages to a task.
#[derive(Debug)]
pub struct TaskHandle<T> {
    tx: mpsc::Sender<TaskMessage<T>>,
}

impl<T> Clone for TaskHandle<T> {
    fn clone(&self) -> Self {
        Self {
            tx: self.tx.clone(),
        }
    }
}

impl<T> TaskHandle<T> {
    /// Creates a new task handle from a sender.
    pub fn new(tx: mpsc::Sender<TaskMessage<T>>) -> Self {
        Self { tx }
    }

    /// Sends a message to the task.
    ///
    /// Returns an error if the task has been dropped.
    pub async fn send(&self, msg: T) -> Result<(), mpsc::error::SendError<TaskMessage<T>>> {
        self.tx.send(TaskMessage::Message(msg)).await
    }

    /// Sends a shutdown signal to the task.
    pub async fn shutdown(&self) -> Result<(), mpsc::error::SendError<TaskMessage<T>>> {
        self.tx.send(TaskMessage::Shutdown).await
    }

    /// Returns true if the task channel is closed.
    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }
}

/// Default channel capacity for task message queues.
pub const DEFAULT_CHANNEL_CAPACITY: usize = 256;

/// Timer tick period in milliseconds.
pub const TICK_PERIOD_MS: u64 = 1000;

// ============================================================================
// EMM Task
// ============================================================================

/// The EMM task: owns the EMM layer and serializes all NAS events for it.
///
/// SAP primitives produced by the procedures leave through the channel
/// dispatcher; whoever owns the receiving end (the access-stratum side, the
/// demo driver, a test harness) consumes them.
pub struct EmmTask {
    layer: EmmLayer<ChannelSapDispatch>,
}

impl EmmTask {
    /// Creates the EMM task and the receiving end of its SAP channel.
    pub fn new(config: MmeConfig) -> (Self, mpsc::UnboundedReceiver<EmmSapPrimitive>) {
        let (sap, sap_rx) = ChannelSapDispatch::new();
        (
            Self {
                layer: EmmLayer::new(config, sap),
            },
            sap_rx,
        )
    }

    fn handle_message(&mut self, msg: EmmMessage) {
        match msg {
            EmmMessage::AdmitUe { ue_id } => self.layer.add_ue(ue_id),
            EmmMessage::ReleaseUe { ue_id } => self.layer.remove_ue(ue_id),
            EmmMessage::InitiateIdentification {
                ue_id,
                identity_type,
            } => {
                if let Err(err) =
                    self.layer
                        .begin_identification(ue_id, identity_type, ProcedureCallbacks::noop())
                {
                    error!("EMM - Identification initiation failed for {ue_id}: {err}");
                }
            }
            EmmMessage::IdentityResponse { ue_id, identity } => {
                if let Err(err) = self.layer.complete_identification(ue_id, identity) {
                    error!("EMM - Identity response handling failed for {ue_id}: {err}");
                }
            }
            EmmMessage::AbortProcedure { ue_id } => {
                if let Err(err) = self.layer.abort_common_procedure(ue_id) {
                    error!("EMM - Procedure abort failed for {ue_id}: {err}");
                }
            }
        }
    }
}

#[async_trait::async_trait]
impl Task for EmmTask {
    type Message = EmmMessage;

    async fn run(&mut self, mut rx: mpsc::Receiver<TaskMessage<EmmMessage>>) {
        info!("EMM task started ({})", self.layer.config());
        let mut tick =
            tokio::time::interval(tokio::time::Duration::from_millis(TICK_PERIOD_MS));
        tick.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

        loop {
            tokio::select! {
                msg = rx.recv() => match msg {
                    Some(TaskMessage::Message(msg)) => {
                        debug!("EMM - Handling {msg:?}");
                        self.handle_message(msg);
                    }
                    Some(TaskMessage::Shutdown) | None => break,
                },
                _ = tick.tick() => self.layer.perform_tick(),
            }
        }
        info!("EMM task stopped");
    }
}

/// Spawns the EMM task, returning its handle and the SAP receiving end.
pub fn spawn_emm_task(
    config: MmeConfig,
) -> (
    TaskHandle<EmmMessage>,
    mpsc::UnboundedReceiver<EmmSapPrimitive>,
    tokio::task::JoinHandle<()>,
) {
    let (tx, rx) = mpsc::channel(DEFAULT_CHANNEL_CAPACITY);
    let (mut task, sap_rx) = EmmTask::new(config);
    let join = tokio::spawn(async move { task.run(rx).await });
    (TaskHandle::new(tx), sap_rx, join)
}

// ============================================================================
// Tests
// ============================================================================
