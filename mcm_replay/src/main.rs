use std::cell::RefCell;
use std::fs;
use std::rc::Rc;

use anyhow::{anyhow, Context, Result};
use log::info;
use mcm_bridge::{InputConfig, InputSource, MemoryHost, UiCall};
use mcm_trace::{load_trace, CaptureWriter, Hello, TraceEvent};

mod cli;
mod queue;
mod replay;

use queue::TraceQueue;
use replay::{ReplayLog, ReplaySession, SharedSink};

fn main() -> Result<()> {
    env_logger::init();
    let args = cli::parse()?;

    let config = InputConfig::from_json_file(args.config.as_deref()).context("loading input config")?;
    let entries = load_trace(&args.trace)
        .with_context(|| format!("reading trace {}", args.trace.display()))?;
    let host = MemoryHost::from_fixture_file(&args.ui_fixture)
        .with_context(|| format!("loading ui fixture {}", args.ui_fixture.display()))?;

    let has_frames = entries
        .iter()
        .any(|entry| matches!(entry.event, TraceEvent::Controller(_)));
    if config.source == InputSource::HardwarePoll && !has_frames {
        eprintln!("[mcm_replay] warning: hardware_poll configured but the trace has no controller frames");
    }

    let mut queue = TraceQueue::new(entries);
    info!("replaying {} entries from {}", queue.len(), args.trace.display());
    let mut session = ReplaySession::new(config, host);
    let capture = match args.record_capture.as_ref() {
        Some(_) => {
            let hello = Hello::new("mcm_replay", Some(env!("CARGO_PKG_VERSION").to_string()));
            let writer = CaptureWriter::new(Vec::new(), session.origin(), &hello)
                .context("starting input capture")?;
            let shared = Rc::new(RefCell::new(writer));
            session.record_to(Box::new(SharedSink(Rc::clone(&shared))));
            Some(shared)
        }
        None => None,
    };

    let log = session.run(&mut queue);

    if let (Some(path), Some(shared)) = (args.record_capture.as_ref(), capture) {
        let writer = Rc::try_unwrap(shared)
            .map_err(|_| anyhow!("input capture is still shared after the replay"))?
            .into_inner();
        let recorded = writer.entries();
        let bytes = writer.finish().context("finishing input capture")?;
        fs::write(path, bytes)
            .with_context(|| format!("writing input capture to {}", path.display()))?;
        println!("Saved {recorded} captured events to {}", path.display());
    }

    if let Some(path) = args.log_json.as_ref() {
        let json = serde_json::to_string_pretty(&log).context("serializing replay log to JSON")?;
        fs::write(path, json)
            .with_context(|| format!("writing replay log to {}", path.display()))?;
        println!("Saved replay log JSON to {}", path.display());
    }

    describe(&log, args.verbose);
    Ok(())
}

fn describe(log: &ReplayLog, verbose: bool) {
    println!("Replayed {} entries over {} ticks", log.entries, log.ticks);
    if let Some(version) = log.hardware_interface {
        println!("Hardware polling via {version}");
    }
    println!(
        "UI calls: {} | undelivered: {}",
        log.calls.len(),
        log.undelivered()
    );
    if !verbose {
        return;
    }
    for (index, call) in log.calls.iter().enumerate() {
        match call {
            UiCall::Invoke {
                target,
                method,
                args,
                delivered,
            } => {
                let args: Vec<String> = args.iter().map(|arg| arg.to_string()).collect();
                let marker = if *delivered { "" } else { " (undelivered)" };
                println!("  {index:>4}. {target}.{method}({}){marker}", args.join(", "));
            }
            UiCall::SetMember {
                target,
                member,
                value,
                applied,
            } => {
                let marker = if *applied { "" } else { " (not applied)" };
                println!("  {index:>4}. {target}.{member} = {value}{marker}");
            }
        }
    }
}
