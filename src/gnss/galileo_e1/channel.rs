
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::Sample;

use super::tracking::{Tracking, TrackingEvent, TrackingRecord, TrackingResult};

/// Advisory control messages for a running tracking channel
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ChannelControl {
	PreambleTimestamp(f64),
}

/// One tracking controller running to completion on its own task: samples in,
/// synchronization records out, telemetry hints on a control port, and loss-of-lock
/// events published on a dedicated port that never blocks the processing loop.
pub struct TrackingChannel {
	pub tx_control: mpsc::Sender<ChannelControl>,
	pub tx_input:   mpsc::Sender<Sample>,
	pub rx_output:  mpsc::Receiver<TrackingRecord>,
	pub rx_events:  mpsc::UnboundedReceiver<TrackingEvent>,
	pub handle:     JoinHandle<Result<(), &'static str>>,
}

impl TrackingChannel {

	/// Takes ownership of an armed controller and drives it one sample at a time as
	/// input arrives.
	pub fn spawn(mut trk:Tracking) -> Self {

		let (tx_control, mut rx_control) = mpsc::channel::<ChannelControl>(10);
		let (tx_input,   mut rx_input)   = mpsc::channel::<Sample>(10);
		let (tx_output,  rx_output)      = mpsc::channel::<TrackingRecord>(10);
		let (tx_events,  rx_events)      = mpsc::unbounded_channel::<TrackingEvent>();

		let handle:JoinHandle<Result<(), &'static str>> = tokio::spawn(async move {

			'rx: while let Some(s) = rx_input.recv().await {

				// Interleaving hint handling with sample handling keeps the controller
				// single-threaded without a mutex; hints are advisory and never stall
				// the period in flight
				if let Ok(ChannelControl::PreambleTimestamp(t)) = rx_control.try_recv() {
					trk.handle_preamble_timestamp(t);
				}

				let result = trk.apply(&s);

				while let Some(event) = trk.pop_event() {
					// A closed event port is not a reason to stop tracking
					tx_events.send(event).ok();
				}

				match result {
					TrackingResult::Ready(record) => tx_output.send(record).await.map_err(|_| "Unable to send tracking record")?,
					TrackingResult::NotReady => (),
					TrackingResult::Err(e) => {
						eprintln!("Error in tracking channel: {:?}", e);
						break 'rx;
					},
				}

			}

			Ok(())
		});

		TrackingChannel { tx_control, tx_input, rx_output, rx_events, handle }
	}

	/// Closes the input and control ports and waits for the task to drain.
	pub async fn shutdown(self) -> Result<(), &'static str> {

		let TrackingChannel { tx_control, tx_input, rx_output:_, rx_events:_, handle } = self;

		drop(tx_control);
		drop(tx_input);

		handle.await.unwrap()?;

		Ok(())
	}

}
