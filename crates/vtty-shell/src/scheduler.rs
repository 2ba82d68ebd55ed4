//! Task scheduler.
//!
//! The task list lives behind one mutex and one condition variable. A
//! persistent tick thread walks the list whenever work is pending:
//!
//! - `Waiting` records get their own thread and become `Running`
//! - `Running` records have their signal queue drained into `on_signal`
//! - `Completed` and `Deathed` records become `Deleted`
//! - `Deleted` records are erased, dropping the command and joining the thread
//!
//! The tick holds the lock for a whole pass, so signal handlers run while
//! admission is blocked.

use std::any::Any;
use std::collections::VecDeque;
use std::panic::{self, AssertUnwindSafe};
use std::sync::{Arc, Condvar, Mutex};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant, SystemTime};

use vtty_io::Output;
use vtty_types::sync::{lock, wait};
use vtty_types::{
    Result, Signal, SignalKind, TaskId, TaskIdCounter, TaskState, VttyConfig, VttyError,
};

use crate::command::{Command, CommandDescriptor};

const SHUTDOWN_POLL: Duration = Duration::from_millis(5);

/// Read-only snapshot of one task.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskInfo {
    pub id: TaskId,
    pub name: String,
    pub raw_args: String,
    pub created_at: SystemTime,
    pub finished_at: Option<SystemTime>,
    pub state: TaskState,
}

struct TaskRecord {
    id: TaskId,
    descriptor: Arc<CommandDescriptor>,
    raw_args: String,
    state: TaskState,
    signals: VecDeque<Signal>,
    command: Option<Arc<dyn Command>>,
    created_at: SystemTime,
    finished_at: Option<SystemTime>,
    worker: Option<JoinHandle<()>>,
}

impl TaskRecord {
    fn name(&self) -> &str {
        self.descriptor.name()
    }

    fn info(&self) -> TaskInfo {
        TaskInfo {
            id: self.id,
            name: self.name().to_string(),
            raw_args: self.raw_args.clone(),
            created_at: self.created_at,
            finished_at: self.finished_at,
            state: self.state,
        }
    }
}

struct TaskTable {
    records: Vec<TaskRecord>,
    /// Work pending for the tick thread.
    dirty: bool,
    running: bool,
}

struct TaskShared {
    table: Mutex<TaskTable>,
    cv: Condvar,
}

impl TaskShared {
    fn wake(&self, table: &mut TaskTable) {
        table.dirty = true;
        self.cv.notify_all();
    }
}

/// Settings the tick thread needs to spawn task threads.
struct SpawnSettings {
    stack_size: Option<usize>,
    output: Output,
}

/// Owns the task set and the tick thread.
pub struct Scheduler {
    shared: Arc<TaskShared>,
    ids: TaskIdCounter,
    config: VttyConfig,
    ticker: Mutex<Option<JoinHandle<()>>>,
}

impl Scheduler {
    /// Start the tick thread. Finished tasks print through `output`.
    pub fn start(config: &VttyConfig, ids: TaskIdCounter, output: Output) -> Result<Self> {
        let shared = Arc::new(TaskShared {
            table: Mutex::new(TaskTable {
                records: Vec::new(),
                dirty: false,
                running: true,
            }),
            cv: Condvar::new(),
        });

        let settings = SpawnSettings {
            stack_size: config.task_stack_size,
            output,
        };
        let tick_shared = Arc::clone(&shared);
        let ticker = thread::Builder::new()
            .name("vtty-sched".into())
            .spawn(move || tick_loop(&tick_shared, &settings))?;

        log::debug!("scheduler started (max {} tasks)", config.max_tasks);
        Ok(Self {
            shared,
            ids,
            config: config.clone(),
            ticker: Mutex::new(Some(ticker)),
        })
    }

    fn occupancy(&self, table: &TaskTable) -> usize {
        table
            .records
            .iter()
            .filter(|r| !self.config.is_privileged(r.name()))
            .count()
    }

    /// Admit a new task in `Waiting` state.
    ///
    /// `make` builds the command once the id is allocated. It runs under the
    /// task-list lock and must not call back into the scheduler. A panic in
    /// `make` admits nothing and returns `CommandCreate`.
    pub fn new_task<F>(
        &self,
        descriptor: &Arc<CommandDescriptor>,
        raw_args: &str,
        args: Vec<String>,
        make: F,
    ) -> Result<TaskId>
    where
        F: FnOnce(TaskId, &[String]) -> Box<dyn Command>,
    {
        let mut table = lock(&self.shared.table);
        if !table.running {
            return Err(VttyError::ShuttingDown);
        }

        let name = descriptor.name();
        let max_tasks = self.config.max_tasks;
        if !self.config.is_privileged(name) && self.occupancy(&table) >= max_tasks {
            log::warn!("task limit {max_tasks} reached, rejecting {name}");
            return Err(VttyError::TaskLimit(max_tasks));
        }

        let id = self.ids.next_id();
        let built = panic::catch_unwind(AssertUnwindSafe(|| make(id, &args)));
        let command: Arc<dyn Command> = match built {
            Ok(command) => Arc::from(command),
            Err(payload) => {
                log::error!(
                    "task {id} ({name}) factory panicked: {}",
                    panic_message(payload.as_ref())
                );
                return Err(VttyError::CommandCreate(name.to_string()));
            },
        };
        table.records.push(TaskRecord {
            id,
            descriptor: Arc::clone(descriptor),
            raw_args: raw_args.to_string(),
            state: TaskState::Waiting,
            signals: VecDeque::new(),
            command: Some(command),
            created_at: SystemTime::now(),
            finished_at: None,
            worker: None,
        });
        log::debug!("task {id} ({name}) admitted");
        self.shared.wake(&mut table);
        Ok(id)
    }

    /// Queue a signal on every listed task. Unknown ids are ignored.
    /// Returns how many tasks received it.
    pub fn sig_task(&self, ids: &[TaskId], kind: SignalKind, payload: &str) -> usize {
        let mut table = lock(&self.shared.table);
        let mut delivered = 0;
        for record in table.records.iter_mut().filter(|r| ids.contains(&r.id)) {
            record.signals.push_back(Signal::new(kind, payload));
            delivered += 1;
        }
        if delivered > 0 {
            self.shared.wake(&mut table);
        }
        delivered
    }

    /// Send `Exit` to one task. Returns false when no such task exists.
    pub fn del_task(&self, id: TaskId) -> bool {
        self.sig_task(&[id], SignalKind::Exit, "") > 0
    }

    /// Send `Exit` to every task of a command. Returns the ids targeted.
    pub fn del_task_by_name(&self, name: &str) -> Vec<TaskId> {
        let ids = self.get_task_id_list(name);
        if !ids.is_empty() {
            self.sig_task(&ids, SignalKind::Exit, "");
        }
        ids
    }

    pub fn get_task_info(&self) -> Vec<TaskInfo> {
        lock(&self.shared.table)
            .records
            .iter()
            .map(TaskRecord::info)
            .collect()
    }

    pub fn task_info(&self, id: TaskId) -> Option<TaskInfo> {
        lock(&self.shared.table)
            .records
            .iter()
            .find(|r| r.id == id)
            .map(TaskRecord::info)
    }

    pub fn task_exists(&self, id: TaskId) -> bool {
        lock(&self.shared.table).records.iter().any(|r| r.id == id)
    }

    pub fn task_exists_by_name(&self, name: &str) -> bool {
        lock(&self.shared.table)
            .records
            .iter()
            .any(|r| r.name() == name)
    }

    pub fn get_task_id_list(&self, name: &str) -> Vec<TaskId> {
        lock(&self.shared.table)
            .records
            .iter()
            .filter(|r| r.name() == name)
            .map(|r| r.id)
            .collect()
    }

    /// Records counted against the admission ceiling.
    pub fn active_count(&self) -> usize {
        self.occupancy(&lock(&self.shared.table))
    }

    pub fn len(&self) -> usize {
        lock(&self.shared.table).records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Stop the tick thread and ask every running task to exit.
    ///
    /// Waits up to `grace` for task threads, then drops every record. Threads
    /// still running are detached with a warning. Idempotent.
    pub fn shutdown(&self, grace: Duration) {
        {
            let mut table = lock(&self.shared.table);
            if !table.running {
                return;
            }
            table.running = false;
            for record in table
                .records
                .iter_mut()
                .filter(|r| r.state == TaskState::Running)
            {
                record.signals.push_back(Signal::exit());
                deliver_signals(record);
            }
            self.shared.cv.notify_all();
        }

        if let Some(ticker) = lock(&self.ticker).take()
            && ticker.join().is_err()
        {
            log::error!("scheduler tick thread panicked");
        }

        let deadline = Instant::now() + grace;
        while Instant::now() < deadline {
            let busy = lock(&self.shared.table)
                .records
                .iter()
                .any(|r| r.worker.as_ref().is_some_and(|w| !w.is_finished()));
            if !busy {
                break;
            }
            thread::sleep(SHUTDOWN_POLL);
        }

        let records = std::mem::take(&mut lock(&self.shared.table).records);
        for record in records {
            reap(record);
        }
        log::debug!("scheduler stopped");
    }
}

impl Drop for Scheduler {
    fn drop(&mut self) {
        self.shutdown(Duration::ZERO);
    }
}

fn tick_loop(shared: &Arc<TaskShared>, settings: &SpawnSettings) {
    loop {
        let reaped = {
            let mut table = lock(&shared.table);
            while !table.dirty && table.running {
                table = wait(&shared.cv, table);
            }
            if !table.running {
                break;
            }
            table.dirty = false;
            tick(shared, &mut table, settings)
        };
        for record in reaped {
            reap(record);
        }
    }
}

/// One pass over the task list. Returns the erased records.
fn tick(
    shared: &Arc<TaskShared>,
    table: &mut TaskTable,
    settings: &SpawnSettings,
) -> Vec<TaskRecord> {
    let mut reaped = Vec::new();
    let mut transitional = false;
    let mut i = 0;

    while i < table.records.len() {
        let record = &mut table.records[i];
        match record.state {
            TaskState::Waiting => {
                spawn_worker(shared, record, settings);
                if record.state == TaskState::Running {
                    deliver_signals(record);
                } else {
                    transitional = true;
                }
            },
            TaskState::Running => deliver_signals(record),
            TaskState::Completed | TaskState::Deathed => {
                log::debug!("task {} {} -> DELETED", record.id, record.state);
                record.state = TaskState::Deleted;
                transitional = true;
            },
            TaskState::Deleted => {
                reaped.push(table.records.remove(i));
                continue;
            },
        }
        i += 1;
    }

    if transitional {
        table.dirty = true;
    }
    reaped
}

fn spawn_worker(shared: &Arc<TaskShared>, record: &mut TaskRecord, settings: &SpawnSettings) {
    let id = record.id;
    let Some(command) = record.command.as_ref().map(Arc::clone) else {
        log::error!("task {id} has no command instance, skipping");
        return;
    };

    let unit = TaskUnit {
        id,
        command,
        shared: Arc::clone(shared),
        output: settings.output.clone(),
    };
    let mut builder = thread::Builder::new().name(format!("vtty-task-{id}"));
    if let Some(size) = settings.stack_size {
        builder = builder.stack_size(size);
    }

    match builder.spawn(move || unit.run()) {
        Ok(handle) => {
            record.worker = Some(handle);
            record.state = TaskState::Running;
            log::debug!("task {id} ({}) running", record.name());
        },
        Err(e) => {
            log::error!("task {id} ({}) could not be started: {e}", record.name());
            record.state = TaskState::Deathed;
            record.finished_at = Some(SystemTime::now());
            settings
                .output
                .println(format!("Task {id} could not be started."));
        },
    }
}

fn deliver_signals(record: &mut TaskRecord) {
    let Some(command) = record.command.as_ref() else {
        log::error!("task {} has no command instance, skipping", record.id);
        return;
    };
    while let Some(signal) = record.signals.pop_front() {
        log::debug!("task {} <- {}", record.id, signal.kind);
        let delivered = panic::catch_unwind(AssertUnwindSafe(|| command.on_signal(&signal)));
        if let Err(payload) = delivered {
            log::error!(
                "task {} signal handler panicked: {}",
                record.id,
                panic_message(payload.as_ref())
            );
        }
    }
}

/// Drop the command and join the thread of an erased record.
fn reap(mut record: TaskRecord) {
    let id = record.id;
    drop(record.command.take());
    if let Some(worker) = record.worker.take() {
        if worker.is_finished() {
            if worker.join().is_err() {
                log::error!("task {id} thread panicked");
            }
        } else {
            log::warn!("task {id} ({}) still running, detaching", record.name());
        }
    }
    log::debug!("task {id} erased");
}

struct TaskUnit {
    id: TaskId,
    command: Arc<dyn Command>,
    shared: Arc<TaskShared>,
    output: Output,
}

impl TaskUnit {
    fn run(self) {
        let TaskUnit {
            id,
            command,
            shared,
            output,
        } = self;

        let result = panic::catch_unwind(AssertUnwindSafe(|| {
            command.init();
            command.execute()
        }));
        // The record holds the last reference; the command is destroyed
        // when the record is erased.
        drop(command);

        let (state, text) = match result {
            Ok(text) => (TaskState::Completed, text),
            Err(payload) => {
                log::error!("task {id} panicked: {}", panic_message(payload.as_ref()));
                (TaskState::Deathed, format!("Task {id} terminated abnormally."))
            },
        };

        let mut table = lock(&shared.table);
        if let Some(record) = table.records.iter_mut().find(|r| r.id == id) {
            record.finished_at = Some(SystemTime::now());
            record.state = state;
        }
        if !text.is_empty() {
            output.println(text);
        }
        log::debug!("task {id} -> {state}");
        shared.wake(&mut table);
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> &str {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s
    } else {
        "unknown panic"
    }
}
