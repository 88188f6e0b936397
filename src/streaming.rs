//! Power measurement under streaming load
//!
//! The power usage of a sensor node is highest while it streams measurement
//! data. To measure it, two activities run at the same time:
//!
//! 1. A task receives data from the node until it is cancelled.
//! 2. A blocking task runs the external power measurement.
//!
//! The measurement only starts after the first unit of data has arrived. Once
//! it is done, the streaming task is cancelled. Cancellation is cooperative:
//! the streaming task stops waiting for data as soon as it is cancelled and
//! closes the stream on exit. If one activity fails, the other one is stopped
//! (or, for the blocking measurement, awaited) before the error is returned.
//! Dropping the returned future cancels the streaming task too.

use std::sync::Arc;

use tokio::sync::{oneshot, watch};
use tokio::task;
use tracing::{debug, info, warn};

use crate::device::{DataStream, SensorNode, StreamingConfiguration};
use crate::error::{IcotestError, IcotestResult};

/// Measure power usage while `node` streams data
///
/// # Arguments
/// * `node` - Sensor node to stream data from
/// * `config` - Channels to stream
/// * `measure` - Blocking power measurement returning milliwatts
///
/// # Errors
/// Returns the error of the measurement or of the data stream. A stream that
/// ends before the measurement is finished is reported as
/// [`IcotestError::StreamEnded`].
///
/// # Example
///
/// ```rust,ignore
/// let commander = Arc::new(Commander::from_settings(&settings.commander)?);
/// let milliwatts = measure_power_while_streaming(node, StreamingConfiguration::first_only(), {
///     let commander = commander.clone();
///     move || commander.read_power_usage(1.0)
/// })
/// .await?;
/// ```
pub async fn measure_power_while_streaming<N, F>(
    node: Arc<N>,
    config: StreamingConfiguration,
    measure: F,
) -> IcotestResult<f64>
where
    N: SensorNode + ?Sized + 'static,
    F: FnOnce() -> IcotestResult<f64> + Send + 'static,
{
    let (ready_tx, ready_rx) = oneshot::channel();
    let (cancel_tx, cancel_rx) = watch::channel(false);
    let cancel = CancelOnDrop(cancel_tx);

    let mut streaming = tokio::spawn(stream_until_cancelled(node, config, ready_tx, cancel_rx));

    if ready_rx.await.is_err() {
        // The streaming task only drops the sender without signalling once it is done
        return Err(match streaming.await? {
            Ok(_) => IcotestError::StreamEnded,
            Err(err) => err,
        });
    }

    let mut measurement = task::spawn_blocking(measure);

    tokio::select! {
        measured = &mut measurement => {
            cancel.cancel();
            let streamed = streaming.await;
            let milliwatts = measured??;
            let messages = streamed??;
            info!("Power usage while streaming {messages} messages: {milliwatts} mW");
            Ok(milliwatts)
        }
        streamed = &mut streaming => {
            warn!("Data stream stopped during power measurement, waiting for measurement to finish");
            if let Err(err) = measurement.await? {
                debug!("Power measurement after stream stopped failed: {err}");
            }
            Err(match streamed? {
                Ok(_) => IcotestError::StreamEnded,
                Err(err) => err,
            })
        }
    }
}

/// Cancels the streaming task when dropped, including when the caller drops
/// the measurement future early
struct CancelOnDrop(watch::Sender<bool>);

impl CancelOnDrop {
    fn cancel(&self) {
        self.0.send_replace(true);
    }
}

impl Drop for CancelOnDrop {
    fn drop(&mut self) {
        self.cancel();
    }
}

async fn stream_until_cancelled<N>(
    node: Arc<N>,
    config: StreamingConfiguration,
    ready: oneshot::Sender<()>,
    mut cancel: watch::Receiver<bool>,
) -> IcotestResult<usize>
where
    N: SensorNode + ?Sized,
{
    let mut stream = node.open_data_stream(config).await?;
    let received = receive(stream.as_mut(), ready, &mut cancel).await;
    let closed = stream.close().await;

    let messages = received?;
    closed?;
    debug!("Closed data stream after {messages} messages");
    Ok(messages)
}

async fn receive(
    stream: &mut dyn DataStream,
    ready: oneshot::Sender<()>,
    cancel: &mut watch::Receiver<bool>,
) -> IcotestResult<usize> {
    let mut ready = Some(ready);
    let mut messages = 0;

    loop {
        let cancelled = *cancel.borrow_and_update();
        if cancelled {
            break;
        }
        let next = tokio::select! {
            biased;
            // Fails once the sender is gone, which also ends streaming
            _ = cancel.changed() => break,
            next = stream.next_data() => next?,
        };
        let Some(data) = next else {
            break;
        };
        messages += 1;
        if let Some(ready) = ready.take() {
            debug!("Streaming started (counter {})", data.counter);
            // The receiver is gone if the caller stopped waiting
            let _ = ready.send(());
        }
    }

    Ok(messages)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::device::mock::MockSth;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::time::Duration;

    #[tokio::test]
    async fn measurement_runs_while_stream_is_open() {
        let node = Arc::new(MockSth::new());
        let observer = node.clone();
        let milliwatts = measure_power_while_streaming(
            node.clone(),
            StreamingConfiguration::first_only(),
            move || {
                assert!(observer.is_streaming());
                Ok(45.23)
            },
        )
        .await
        .unwrap();

        assert_eq!(milliwatts, 45.23);
        assert_eq!(node.streams_opened(), 1);
        assert!(!node.is_streaming());
    }

    #[tokio::test]
    async fn failed_measurement_closes_stream() {
        let node = Arc::new(MockSth::new());
        let err = measure_power_while_streaming(
            node.clone(),
            StreamingConfiguration::first_only(),
            || {
                Err(IcotestError::PowerExtraction {
                    output: String::new(),
                })
            },
        )
        .await
        .unwrap_err();

        assert!(matches!(err, IcotestError::PowerExtraction { .. }));
        assert!(!node.is_streaming());
    }

    #[tokio::test]
    async fn stream_failure_before_data_skips_measurement() {
        let node = Arc::new(MockSth::new().with_stream_failure_after(0));
        let measured = Arc::new(AtomicBool::new(false));
        let flag = measured.clone();
        let err = measure_power_while_streaming(
            node.clone(),
            StreamingConfiguration::first_only(),
            move || {
                flag.store(true, Ordering::SeqCst);
                Ok(1.0)
            },
        )
        .await
        .unwrap_err();

        assert!(matches!(err, IcotestError::Device(_)), "{err}");
        assert!(!measured.load(Ordering::SeqCst));
        assert!(!node.is_streaming());
    }

    #[tokio::test]
    async fn stream_failure_during_measurement_is_reported() {
        let node = Arc::new(
            MockSth::new()
                .with_stream_interval(Duration::from_millis(1))
                .with_stream_failure_after(3),
        );
        let err = measure_power_while_streaming(
            node.clone(),
            StreamingConfiguration::first_only(),
            || {
                std::thread::sleep(Duration::from_millis(200));
                Ok(50.0)
            },
        )
        .await
        .unwrap_err();

        assert!(err.to_string().contains("Lost connection"), "{err}");
        assert!(!node.is_streaming());
    }

    #[tokio::test]
    async fn dropped_caller_closes_stream() {
        let node = Arc::new(MockSth::new());
        let result = tokio::time::timeout(
            Duration::from_millis(50),
            measure_power_while_streaming(
                node.clone(),
                StreamingConfiguration::first_only(),
                || {
                    std::thread::sleep(Duration::from_millis(200));
                    Ok(50.0)
                },
            ),
        )
        .await;
        assert!(result.is_err());

        tokio::time::sleep(Duration::from_millis(100)).await;
        assert_eq!(node.streams_opened(), 1);
        assert!(!node.is_streaming());
    }

    #[tokio::test]
    async fn stalled_stream_is_closed_after_measurement() {
        let node = Arc::new(MockSth::new().with_stream_stall_after(1));
        let milliwatts = tokio::time::timeout(
            Duration::from_secs(5),
            measure_power_while_streaming(
                node.clone(),
                StreamingConfiguration::first_only(),
                || Ok(45.23),
            ),
        )
        .await
        .unwrap()
        .unwrap();

        assert_eq!(milliwatts, 45.23);
        assert!(!node.is_streaming());
    }

    #[tokio::test]
    async fn open_failure_is_reported() {
        let node = Arc::new(MockSth::new());
        let err = measure_power_while_streaming(node, StreamingConfiguration::default(), || Ok(1.0))
            .await
            .unwrap_err();
        assert!(err.to_string().contains("at least one enabled channel"), "{err}");
    }
}
