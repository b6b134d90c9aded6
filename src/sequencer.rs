use std::sync::{
    Arc,
    atomic::{AtomicBool, Ordering},
};

use embedded_io::{Read, Write};
use fugit::MillisDurationU32;
use log::{Level, Log};

use crate::{
    channel::{Channel, SerialChannel},
    delay::Delay,
    error::{Error, Result, SendError},
    logging::emit,
    packets::{Catalog, Packet},
    types::{PhaseResult, RunPlan, RunReport},
};

/// Bytes received after a send.
pub type Response = Vec<u8>;

/// Outcome of a single send. `Ok(None)` means the frame went out but nothing came back.
pub type SendResult<I> = core::result::Result<Option<Response>, SendError<I>>;

const RULE: &str = "============================================================";

/// Drives the probe: sends each phase's frame the configured number of times and
/// captures whatever the inverter answers.
///
/// The sequencer owns the [Channel] for its whole life and closes it when a run ends,
/// however it ends.
pub struct Sequencer<'a, S: SerialChannel, D: Delay> {
    channel: Channel<'a, S>,
    catalog: Catalog<'a>,
    plan: RunPlan,
    delay: D,
    logger: &'a dyn Log,
    running: Arc<AtomicBool>,
}

impl<'a, S: SerialChannel, D: Delay> Sequencer<'a, S, D> {
    /// Create a sequencer with the GW3000SS frames and the default [RunPlan].
    pub fn new(channel: Channel<'a, S>, delay: D, logger: &'a dyn Log) -> Self {
        Self {
            channel,
            catalog: Catalog::goodwe(),
            plan: RunPlan::default(),
            delay,
            logger,
            running: Arc::new(AtomicBool::new(true)),
        }
    }

    pub fn with_catalog(mut self, catalog: Catalog<'a>) -> Self {
        self.catalog = catalog;
        self
    }

    pub fn with_plan(mut self, plan: RunPlan) -> Self {
        self.plan = plan;
        self
    }

    /// Share a flag with a signal handler. Clearing it stops the run at the next attempt.
    pub fn with_running_flag(mut self, running: Arc<AtomicBool>) -> Self {
        self.running = running;
        self
    }

    /// Get a clone of the running flag for signal handling.
    pub fn running_flag(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.running)
    }

    pub fn channel(&self) -> &Channel<'a, S> {
        &self.channel
    }

    /// Send one frame and collect whatever arrives within the settle delay.
    ///
    /// Failures are logged here and returned, never raised further.
    pub fn send(&mut self, packet: Packet<'_>) -> SendResult<S::Error> {
        let result = self.try_send(packet);
        if let Err(err) = &result {
            emit!(self.logger, Level::Error, "{}", err);
        }
        result
    }

    fn try_send(&mut self, packet: Packet<'_>) -> SendResult<S::Error> {
        let logger = self.logger;
        let port = self.channel.port_mut().map_err(|_| SendError::NotOpen)?;

        emit!(logger, Level::Debug, "Sending {}: {}", packet.name(), packet.to_hex());

        // Anything still buffered belongs to an earlier exchange.
        port.clear_input()?;

        let written = port.write(packet.bytes)?;
        if written != packet.len() {
            return Err(SendError::PartialWrite {
                written,
                expected: packet.len(),
            });
        }

        port.flush()?;
        emit!(logger, Level::Debug, "Successfully sent {} bytes", written);

        self.delay.delay(self.plan.settle);

        let available = port.bytes_available().map_err(SendError::from_read)?;
        if available == 0 {
            emit!(logger, Level::Debug, "No response received");
            return Ok(None);
        }

        let mut response = vec![0u8; available];
        let mut filled = 0;
        while filled < available {
            match port.read(&mut response[filled..]).map_err(SendError::from_read)? {
                0 => break,
                n => filled += n,
            }
        }
        response.truncate(filled);

        emit!(
            logger,
            Level::Info,
            "Received response ({} bytes): {}",
            response.len(),
            hex::encode(&response)
        );
        Ok(Some(response))
    }

    /// Send `packet` `count` times, waiting `interval` between sends.
    ///
    /// Individual failures are counted, not retried, and never stop the phase.
    pub fn run_phase(
        &mut self,
        name: &'static str,
        packet: Packet<'_>,
        count: u32,
        interval: MillisDurationU32,
    ) -> Result<PhaseResult, S::Error> {
        if !self.channel.is_open() {
            emit!(self.logger, Level::Error, "Serial connection not established");
            return Err(Error::NotOpen);
        }

        emit!(self.logger, Level::Info, "Starting {} test sequence", name);
        emit!(
            self.logger,
            Level::Info,
            "Will send packet {} times with {:.1}s intervals",
            count,
            seconds(interval)
        );

        let mut successful = 0;
        for i in 0..count {
            self.check_running()?;
            emit!(self.logger, Level::Info, "Transmission {}/{}", i + 1, count);

            let outcome = self.send(packet);
            // An interrupted settle delay leaves the attempt incomplete.
            self.check_running()?;

            match outcome {
                Ok(_) => {
                    successful += 1;
                    emit!(self.logger, Level::Info, "✓ Transmission {} successful", i + 1);
                }
                Err(_) => {
                    emit!(self.logger, Level::Warn, "✗ Transmission {} failed", i + 1);
                }
            }

            if i + 1 < count {
                emit!(
                    self.logger,
                    Level::Debug,
                    "Waiting {:.1} seconds before next transmission",
                    seconds(interval)
                );
                self.delay.delay(interval);
            }
        }

        emit!(
            self.logger,
            Level::Info,
            "Completed {} test sequence: {}/{} successful",
            name,
            successful,
            count
        );
        Ok(PhaseResult::new(name, count, successful))
    }

    /// Execute every phase of the plan, close the channel and log the summary.
    pub fn run(&mut self) -> Result<RunReport, S::Error> {
        let outcome = self.run_phases();

        match &outcome {
            Ok(_) => {}
            Err(Error::Interrupted) => {
                emit!(self.logger, Level::Warn, "Test interrupted by user");
            }
            Err(err) => {
                emit!(self.logger, Level::Error, "Unexpected error during test: {}", err);
            }
        }

        self.channel.close();

        if let Ok(report) = &outcome {
            self.log_summary(report);
        }
        outcome
    }

    /// Run the full sequence.
    ///
    /// Returns true once every phase has run, however many sends succeeded. Returns false
    /// only when the run was cut short.
    pub fn run_all(&mut self) -> bool {
        self.run().is_ok()
    }

    fn run_phases(&mut self) -> Result<RunReport, S::Error> {
        emit!(self.logger, Level::Info, "{}", RULE);
        emit!(self.logger, Level::Info, "Starting RS485 Communication Test");
        emit!(
            self.logger,
            Level::Info,
            "Test started at: {}",
            chrono::Local::now().format("%Y-%m-%d %H:%M:%S")
        );
        emit!(self.logger, Level::Info, "{}", RULE);

        let phases = self.plan.phases.clone();
        let mut report = RunReport::default();

        for (index, phase) in phases.iter().enumerate() {
            if index > 0 {
                self.delay.delay(self.plan.phase_gap);
            }
            self.check_running()?;

            let packet = self
                .catalog
                .get(phase.packet)
                .ok_or(Error::MissingPacket(phase.packet))?;

            emit!(self.logger, Level::Info, "{}", RULE);
            emit!(self.logger, Level::Info, "PHASE {}: {}", index + 1, phase.name);
            emit!(self.logger, Level::Info, "{}", RULE);

            let result =
                self.run_phase(phase.name, packet, self.plan.attempts, self.plan.interval)?;
            report.push(result);
        }

        self.check_running()?;
        Ok(report)
    }

    fn log_summary(&self, report: &RunReport) {
        emit!(self.logger, Level::Info, "{}", RULE);
        emit!(self.logger, Level::Info, "TEST SUMMARY");
        emit!(self.logger, Level::Info, "{}", RULE);
        for (index, result) in report.phases().iter().enumerate() {
            emit!(
                self.logger,
                Level::Info,
                "Phase {} ({}): {}/{} successful",
                index + 1,
                result.name(),
                result.successful(),
                result.requested()
            );
        }
        emit!(
            self.logger,
            Level::Info,
            "Total: {}/{} successful",
            report.total_successful(),
            report.total_requested()
        );
    }

    fn check_running(&self) -> Result<(), S::Error> {
        if self.running.load(Ordering::SeqCst) {
            Ok(())
        } else {
            Err(Error::Interrupted)
        }
    }
}

fn seconds(duration: MillisDurationU32) -> f32 {
    duration.to_millis() as f32 / 1000.0
}
