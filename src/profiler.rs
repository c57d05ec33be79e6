/*!
Event profiling.

A [`Profiler`] collects the events of named queues, which must have profiling enabled, and
computes a [`Profile`]: the time spent per event name, the overlaps between events and the
effective device time.

```
# use clkit::{buffer::Buffer, cl, context::Context, profiler::Profiler, queue::Queue};
# fn main() -> clkit::result::Result<()> {
# clkit::runtime::install_host().ok();
let context = Context::new_gpu()?;
let queue = Queue::builder(&context).profiling(true).build()?;
let mut profiler = Profiler::new();
profiler.start();
let buffer = Buffer::new(&context, cl::MEM_READ_WRITE, 1024)?;
buffer.fill(&queue, &[0u8], 0, 1024, None)?.set_name("clear");
buffer.write(&queue, 0, &[1u32; 256], None)?;
profiler.add_queue("main", &queue);
profiler.stop();
let profile = profiler.calc()?;
assert_eq!(profile.aggregates().len(), 2);
assert!(profile.aggregate("clear").is_some());
println!("{}", profile.summary());
# Ok(())
# }
```
*/

use crate::{
    cl,
    error::Error,
    event::Event,
    queue::Queue,
    result::Result,
};
use std::{
    collections::HashMap,
    fmt::Write as _,
    fs::File,
    io::{self, BufWriter, Write},
    path::Path,
    time::{Duration, Instant},
};

/// Time spent in events with the same name.
#[derive(Clone, Debug, PartialEq)]
pub struct ProfAgg {
    pub event_name: String,
    /// Nanoseconds.
    pub absolute_time: u64,
    /// Fraction of the time of all events.
    pub relative_time: f64,
}

/// The timestamps of one event, in nanoseconds.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct ProfInfo {
    pub event_name: String,
    pub command_type: u32,
    pub queue_name: String,
    pub t_queued: u64,
    pub t_submit: u64,
    pub t_start: u64,
    pub t_end: u64,
}

/// Start or end.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash, derive_more::IsVariant)]
pub enum InstantKind {
    Start,
    End,
}

/// The start or end instant of an event.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct ProfInst {
    pub event_name: String,
    pub queue_name: String,
    /// Identifies the event, the start and end instants of an event share it.
    pub id: usize,
    /// Nanoseconds.
    pub instant: u64,
    pub kind: InstantKind,
}

/// Time during which events of two names executed simultaneously.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct ProfOverlap {
    pub event1_name: String,
    pub event2_name: String,
    /// Nanoseconds.
    pub duration: u64,
}

/// Formatting of [`Profile::export_info`].
#[derive(Clone, Debug)]
pub struct ExportOptions {
    pub separator: String,
    pub newline: String,
    /// Written before and after queue names.
    pub queue_delim: String,
    /// Written before and after event names.
    pub event_name_delim: String,
    /// Subtract the earliest start from all instants.
    pub zero_start: bool,
}

impl Default for ExportOptions {
    fn default() -> Self {
        Self {
            separator: "\t".into(),
            newline: "\n".into(),
            queue_delim: String::new(),
            event_name_delim: String::new(),
            zero_start: true,
        }
    }
}

/// Collects events for profiling.
#[derive(Default, Debug)]
pub struct Profiler {
    queues: Vec<(String, Queue)>,
    events: Vec<(String, Event)>,
    started: Option<Instant>,
    elapsed: Option<Duration>,
}

impl Profiler {
    pub fn new() -> Self {
        Self::default()
    }
    /// Starts the wall clock timer.
    pub fn start(&mut self) {
        self.started = Some(Instant::now());
        self.elapsed = None;
    }
    /// Stops the wall clock timer.
    pub fn stop(&mut self) {
        if let Some(started) = self.started {
            self.elapsed = Some(started.elapsed());
        }
    }
    /// The wall clock time since [`start`](Self::start), up to [`stop`](Self::stop) if stopped.
    pub fn time_elapsed(&self) -> Option<Duration> {
        self.elapsed
            .or_else(|| self.started.map(|started| started.elapsed()))
    }
    /// Adds the events of `queue` under `name`.
    ///
    /// The events currently held by the queue are collected now, so the queue may be finished
    /// before [`calc`](Self::calc). Events produced later are collected by `calc`. Adding a
    /// queue under an existing name replaces it.
    pub fn add_queue(&mut self, name: impl Into<String>, queue: &Queue) {
        let name = name.into();
        if let Some(index) = self.queues.iter().position(|(x, _)| *x == name) {
            log::warn!("profiler already has a queue named \"{name}\", replacing it");
            self.queues.remove(index);
            self.events.retain(|(x, _)| *x != name);
        }
        self.add_events(&name, queue.events());
        self.queues.push((name, queue.clone()));
    }
    /// Adds `events` under the queue name `name`.
    pub fn add_events(&mut self, name: &str, events: impl IntoIterator<Item = Event>) {
        for event in events {
            if !self.events.iter().any(|(_, x)| *x == event) {
                self.events.push((name.to_string(), event));
            }
        }
    }
    /// Waits for the collected events and computes the profile.
    ///
    /// The events of the added queues are released from the queues afterwards. Events without
    /// profiling info, like user events, are skipped.
    ///
    /// **errors**
    /// - [`InvalidArgument`](crate::error::ErrorKind::InvalidArgument): A queue does not have
    /// profiling enabled.
    /// - [`Native`](crate::error::ErrorKind::Native): An event failed.
    #[track_caller]
    pub fn calc(mut self) -> Result<Profile> {
        for (name, queue) in self.queues.iter() {
            if !queue.profiling_enabled()? {
                return Err(Error::invalid_argument(format!(
                    "the \"{name}\" queue does not have profiling enabled"
                )));
            }
        }
        let queues = std::mem::take(&mut self.queues);
        for (name, queue) in queues.iter() {
            self.add_events(name, queue.events());
        }
        let mut infos = Vec::with_capacity(self.events.len());
        for (queue_name, event) in self.events.iter() {
            event.wait()?;
            match event_info(queue_name, event) {
                Ok(info) => infos.push(info),
                Err(e) if e.native_code() == Some(cl::PROFILING_INFO_NOT_AVAILABLE) => {
                    log::info!("{event:?} has no profiling info");
                }
                Err(e) => return Err(e),
            }
        }
        for (_, queue) in queues.iter() {
            queue.gc();
        }
        Ok(Profile::new(infos, self.time_elapsed()))
    }
}

fn event_info(queue_name: &str, event: &Event) -> Result<ProfInfo> {
    Ok(ProfInfo {
        event_name: event.final_name()?,
        command_type: event.command_type()?,
        queue_name: queue_name.to_string(),
        t_queued: event.profiling_info(cl::PROFILING_COMMAND_QUEUED)?,
        t_submit: event.profiling_info(cl::PROFILING_COMMAND_SUBMIT)?,
        t_start: event.profiling_info(cl::PROFILING_COMMAND_START)?,
        t_end: event.profiling_info(cl::PROFILING_COMMAND_END)?,
    })
}

/// The result of [`Profiler::calc`].
#[derive(Clone, Debug)]
pub struct Profile {
    infos: Vec<ProfInfo>,
    instants: Vec<ProfInst>,
    aggs: Vec<ProfAgg>,
    overlaps: Vec<ProfOverlap>,
    t_start: u64,
    total_time: u64,
    effective_time: u64,
    elapsed: Option<Duration>,
}

impl Profile {
    fn new(mut infos: Vec<ProfInfo>, elapsed: Option<Duration>) -> Self {
        infos.sort_by_key(|info| (info.t_start, info.t_end));
        // name ids in order of first appearance
        let mut names: Vec<&str> = Vec::new();
        let mut name_ids = HashMap::new();
        for info in infos.iter() {
            name_ids.entry(info.event_name.as_str()).or_insert_with(|| {
                names.push(info.event_name.as_str());
                names.len() - 1
            });
        }
        let mut instants = Vec::with_capacity(2 * infos.len());
        let mut absolute = vec![0u64; names.len()];
        let mut total_time = 0;
        for (id, info) in infos.iter().enumerate() {
            if info.t_end <= info.t_start {
                log::info!(
                    "event \"{}\" did not use device time, its instants are ignored",
                    info.event_name
                );
                continue;
            }
            let duration = info.t_end - info.t_start;
            absolute[name_ids[info.event_name.as_str()]] += duration;
            total_time += duration;
            for (instant, kind) in [(info.t_start, InstantKind::Start), (info.t_end, InstantKind::End)] {
                instants.push(ProfInst {
                    event_name: info.event_name.clone(),
                    queue_name: info.queue_name.clone(),
                    id,
                    instant,
                    kind,
                });
            }
        }
        // ends sort before starts at the same instant, touching events do not overlap
        instants.sort_by_key(|inst| (inst.instant, inst.kind.is_start(), inst.id));
        let t_start = instants.first().map_or(0, |inst| inst.instant);

        let mut overlap_matrix = HashMap::<(usize, usize), u64>::new();
        let mut occurring: Vec<(usize, usize, u64)> = Vec::new();
        let mut effective_time = 0;
        let mut busy_since = 0;
        for inst in instants.iter() {
            let name_id = name_ids[inst.event_name.as_str()];
            match inst.kind {
                InstantKind::Start => {
                    if occurring.is_empty() {
                        busy_since = inst.instant;
                    }
                    occurring.push((inst.id, name_id, inst.instant));
                }
                InstantKind::End => {
                    let index = occurring.iter().position(|(id, ..)| *id == inst.id);
                    let start = match index {
                        Some(index) => occurring.remove(index).2,
                        None => continue,
                    };
                    for (_, other_name_id, other_start) in occurring.iter() {
                        let overlap = inst.instant - start.max(*other_start);
                        if overlap > 0 {
                            let key = (name_id.min(*other_name_id), name_id.max(*other_name_id));
                            *overlap_matrix.entry(key).or_default() += overlap;
                        }
                    }
                    if occurring.is_empty() {
                        effective_time += inst.instant - busy_since;
                    }
                }
            }
        }
        let aggs = names
            .iter()
            .zip(absolute)
            .map(|(name, absolute_time)| ProfAgg {
                event_name: name.to_string(),
                absolute_time,
                relative_time: if total_time > 0 {
                    absolute_time as f64 / total_time as f64
                } else {
                    0.0
                },
            })
            .collect();
        let mut overlaps: Vec<ProfOverlap> = overlap_matrix
            .into_iter()
            .map(|((a, b), duration)| {
                let (a, b) = (names[a].min(names[b]), names[a].max(names[b]));
                ProfOverlap {
                    event1_name: a.to_string(),
                    event2_name: b.to_string(),
                    duration,
                }
            })
            .collect();
        overlaps.sort_by(|a, b| {
            b.duration
                .cmp(&a.duration)
                .then_with(|| a.event1_name.cmp(&b.event1_name))
                .then_with(|| a.event2_name.cmp(&b.event2_name))
        });
        let mut profile = Self {
            infos,
            instants,
            aggs,
            overlaps,
            t_start,
            total_time,
            effective_time,
            elapsed,
        };
        profile.sort_aggregates();
        profile
    }
    fn sort_aggregates(&mut self) {
        self.aggs.sort_by(|a, b| {
            b.absolute_time
                .cmp(&a.absolute_time)
                .then_with(|| a.event_name.cmp(&b.event_name))
        });
    }
    /// Aggregates per event name, by descending time.
    pub fn aggregates(&self) -> &[ProfAgg] {
        &self.aggs
    }
    /// The aggregate of the events named `event_name`.
    pub fn aggregate(&self, event_name: &str) -> Option<&ProfAgg> {
        self.aggs.iter().find(|agg| agg.event_name == event_name)
    }
    /// Per event timestamps, by start.
    pub fn infos(&self) -> &[ProfInfo] {
        &self.infos
    }
    /// Start and end instants of events that used device time, in time order.
    pub fn instants(&self) -> &[ProfInst] {
        &self.instants
    }
    /// Overlaps per pair of event names, by descending duration.
    pub fn overlaps(&self) -> &[ProfOverlap] {
        &self.overlaps
    }
    /// The sum of event durations in nanoseconds.
    pub fn duration(&self) -> u64 {
        self.total_time
    }
    /// The time in nanoseconds during which at least one event executed.
    pub fn effective_duration(&self) -> u64 {
        self.effective_time
    }
    /// The wall clock time measured by the profiler, if it was started.
    pub fn time_elapsed(&self) -> Option<Duration> {
        self.elapsed
    }
    /// A text summary of aggregates, overlaps and times.
    pub fn summary(&self) -> String {
        let line = format!("   {}\n", "-".repeat(66));
        let mut s = String::from("\n Aggregate times by event  :\n");
        s.push_str(&line);
        let _ = writeln!(
            s,
            "   | {:<30} | {:>13} | {:>13} |",
            "Event name", "Rel. time (%)", "Abs. time (s)"
        );
        s.push_str(&line);
        for agg in self.aggs.iter() {
            let _ = writeln!(
                s,
                "   | {:<30.30} | {:>13.4} | {:>13.4e} |",
                agg.event_name,
                agg.relative_time * 100.0,
                agg.absolute_time as f64 * 1e-9
            );
        }
        s.push_str(&line);
        if self.total_time > 0 {
            let _ = writeln!(
                s,
                "   {:>32} | {:>13} | {:>13.4e} |",
                "",
                "Total",
                self.total_time as f64 * 1e-9
            );
        }
        if self.overlaps.is_empty() {
            s.push_str(" Event overlaps            : None\n");
        } else {
            s.push_str(" Event overlaps            :\n");
            s.push_str(&line);
            let _ = writeln!(s, "   | {:<22} | {:<22} | {:>12} |", "Event 1", "Event 2", "Overlap (s)");
            s.push_str(&line);
            for overlap in self.overlaps.iter() {
                let _ = writeln!(
                    s,
                    "   | {:<22.22} | {:<22.22} | {:>12.4e} |",
                    overlap.event1_name,
                    overlap.event2_name,
                    overlap.duration as f64 * 1e-9
                );
            }
            s.push_str(&line);
            let _ = writeln!(
                s,
                "   {:>24} | {:>22} | {:>12.4e} |",
                "",
                "Total",
                (self.total_time - self.effective_time) as f64 * 1e-9
            );
            let _ = writeln!(
                s,
                " Tot. of all events (eff.) : {:e}s",
                self.effective_time as f64 * 1e-9
            );
        }
        if let Some(elapsed) = self.elapsed {
            let elapsed = elapsed.as_secs_f64();
            let device = if elapsed > 0.0 {
                self.effective_time as f64 * 1e-9 * 100.0 / elapsed
            } else {
                0.0
            };
            let _ = writeln!(s, " Total elapsed time        : {elapsed:e}s");
            let _ = writeln!(s, " Time spent in device      : {device:.2}%");
            let _ = writeln!(s, " Time spent in host        : {:.2}%", 100.0 - device);
        }
        s.push('\n');
        s
    }
    /// Prints the [`summary`](Self::summary) to stdout.
    pub fn print_summary(&self) {
        print!("{}", self.summary());
    }
    /// Writes one line per event: queue name, start, end and event name.
    pub fn export_info(&self, mut writer: impl Write, options: &ExportOptions) -> io::Result<()> {
        let t_start = if options.zero_start { self.t_start } else { 0 };
        let ExportOptions {
            separator: sep,
            newline,
            queue_delim: qd,
            event_name_delim: ed,
            ..
        } = options;
        for info in self.infos.iter() {
            write!(
                writer,
                "{qd}{}{qd}{sep}{}{sep}{}{sep}{ed}{}{ed}{newline}",
                info.queue_name,
                info.t_start.saturating_sub(t_start),
                info.t_end.saturating_sub(t_start),
                info.event_name,
            )?;
        }
        writer.flush()
    }
    /// Writes [`export_info`](Self::export_info) to the file at `path`.
    ///
    /// **errors**
    /// - [`InvalidArgument`](crate::error::ErrorKind::InvalidArgument): The file can not be
    /// written.
    #[track_caller]
    pub fn export_info_file(&self, path: impl AsRef<Path>, options: &ExportOptions) -> Result<()> {
        let path = path.as_ref();
        File::create(path)
            .and_then(|file| self.export_info(BufWriter::new(file), options))
            .map_err(|e| {
                Error::invalid_argument(format!(
                    "unable to export profiling info to {}: {e}",
                    path.display()
                ))
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        buffer::Buffer, context::Context, dev_container::DevContainer, event::UserEvent,
        wait_list, wrapper::memcheck,
    };

    fn info(name: &str, queue: &str, t_start: u64, t_end: u64) -> ProfInfo {
        ProfInfo {
            event_name: name.into(),
            command_type: cl::COMMAND_USER,
            queue_name: queue.into(),
            t_queued: 0,
            t_submit: 0,
            t_start,
            t_end,
        }
    }

    #[test]
    fn aggregates_and_overlaps() {
        let profile = Profile::new(
            vec![
                info("a", "q1", 100, 200),
                info("b", "q2", 150, 300),
                info("a", "q1", 300, 400),
                info("c", "q3", 120, 180),
                info("empty", "q1", 500, 500),
            ],
            None,
        );
        assert_eq!(profile.duration(), 100 + 150 + 100 + 60);
        // busy from 100 to 400
        assert_eq!(profile.effective_duration(), 300);
        let a = profile.aggregate("a").unwrap();
        assert_eq!(a.absolute_time, 200);
        assert!((a.relative_time - 200.0 / 410.0).abs() < 1e-12);
        assert_eq!(profile.aggregate("empty").unwrap().absolute_time, 0);
        assert_eq!(profile.aggregates()[0].event_name, "a");
        assert_eq!(profile.instants().len(), 8);
        assert_eq!(profile.infos().len(), 5);
        assert_eq!(
            profile.overlaps(),
            [
                ProfOverlap {
                    event1_name: "a".into(),
                    event2_name: "c".into(),
                    duration: 60,
                },
                ProfOverlap {
                    event1_name: "a".into(),
                    event2_name: "b".into(),
                    duration: 50,
                },
                ProfOverlap {
                    event1_name: "b".into(),
                    event2_name: "c".into(),
                    duration: 30,
                },
            ]
        );
        let summary = profile.summary();
        assert!(summary.contains("Aggregate times by event"));
        assert!(summary.contains("Tot. of all events (eff.)"));
        let mut exported = Vec::new();
        profile.export_info(&mut exported, &ExportOptions::default()).unwrap();
        let exported = String::from_utf8(exported).unwrap();
        let lines: Vec<&str> = exported.lines().collect();
        assert_eq!(lines.len(), 5);
        assert_eq!(lines[0], "q1\t0\t100\ta");
    }

    #[test]
    fn touching_events_do_not_overlap() {
        let profile = Profile::new(vec![info("a", "q", 0, 10), info("b", "q", 10, 20)], None);
        assert!(profile.overlaps().is_empty());
        assert_eq!(profile.effective_duration(), 20);
        assert!(profile.summary().contains("Event overlaps            : None"));
    }

    #[test]
    fn profile_queues() {
        let _guard = crate::test_lock();
        {
            let context = Context::new_cpu().unwrap();
            let queues: Vec<Queue> = context
                .all_devices()
                .unwrap()
                .iter()
                .map(|device| {
                    Queue::builder(&context)
                        .device(device)
                        .profiling(true)
                        .build()
                        .unwrap()
                })
                .collect();
            let gate = UserEvent::new(&context).unwrap();
            let size = 64 << 10;
            let buffers: Vec<Buffer> = queues
                .iter()
                .map(|_| Buffer::new(&context, cl::MEM_READ_WRITE, size).unwrap())
                .collect();
            let mut profiler = Profiler::new();
            profiler.start();
            for (queue, buffer) in queues.iter().zip(buffers.iter()) {
                buffer
                    .fill(queue, &[0u8], 0, size, Some(&mut wait_list![&*gate]))
                    .unwrap();
            }
            gate.complete().unwrap();
            profiler.add_queue("first", &queues[0]);
            queues[0].finish().unwrap();
            profiler.add_queue("second", &queues[1]);
            profiler.add_events("user", [gate.clone().into_event()]);
            profiler.stop();
            let profile = profiler.calc().unwrap();
            let fill = profile.aggregate("FILL_BUFFER").unwrap();
            assert_eq!(fill.absolute_time, 2 * (size as u64 / 4));
            assert_eq!(fill.relative_time, 1.0);
            assert_eq!(profile.infos().len(), 2);
            assert!(profile.overlaps().len() <= 1);
            assert!(profile.effective_duration() <= profile.duration());
            assert!(profile.effective_duration() >= size as u64 / 4);
            let mut exported = Vec::new();
            let options = ExportOptions {
                queue_delim: "\"".into(),
                zero_start: false,
                ..ExportOptions::default()
            };
            profile.export_info(&mut exported, &options).unwrap();
            let exported = String::from_utf8(exported).unwrap();
            assert_eq!(exported.lines().count(), 2);
            assert!(exported.lines().all(|line| line.ends_with("\tFILL_BUFFER")));
            assert!(profile.time_elapsed().is_some());
            assert!(queues[1].events().is_empty());
        }
        assert!(memcheck());
    }

    #[test]
    fn requires_profiling_queue() {
        let _guard = crate::test_lock();
        let context = Context::new_gpu().unwrap();
        let queue = Queue::builder(&context).build().unwrap();
        queue.marker(None).unwrap();
        let mut profiler = Profiler::new();
        profiler.add_queue("plain", &queue);
        assert!(profiler.calc().unwrap_err().kind().is_invalid_argument());
    }
}
