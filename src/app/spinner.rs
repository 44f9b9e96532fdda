//! In-flight indicator that lives exactly as long as the work it covers

use std::future::Future;
use std::sync::Arc;

use tokio::sync::oneshot;

use crate::constants::{SPINNER_FRAMES, SPINNER_TICK};
use crate::ui::Renderer;

/// Awaits `work` while a ticker redraws the spinner every tick.
///
/// The ticker is told to stop through a oneshot as soon as `work` resolves
/// and is awaited before returning, so no frame is drawn afterwards.
pub async fn spin_while<F>(renderer: Arc<dyn Renderer>, message: &str, work: F) -> F::Output
where
    F: Future,
{
    let (done_tx, done_rx) = oneshot::channel::<()>();
    let ticker = tokio::spawn(tick(Arc::clone(&renderer), message.to_string(), done_rx));

    let output = work.await;

    let _ = done_tx.send(());
    if let Err(e) = ticker.await {
        tracing::warn!(error = %e, "Spinner task failed");
    }
    output
}

async fn tick(renderer: Arc<dyn Renderer>, message: String, mut done: oneshot::Receiver<()>) {
    let mut interval = tokio::time::interval(SPINNER_TICK);
    let mut frames = SPINNER_FRAMES.iter().cycle();

    loop {
        tokio::select! {
            biased;
            // A dropped sender also ends the loop
            _ = &mut done => break,
            _ = interval.tick() => {
                if let Some(frame) = frames.next() {
                    renderer.spinner(frame, &message);
                }
            }
        }
    }
    renderer.clear_spinner();
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ui::RecordingRenderer;
    use std::time::Duration;

    #[tokio::test]
    async fn test_spinner_stops_with_the_work() {
        let recorder = Arc::new(RecordingRenderer::default());
        let renderer: Arc<dyn Renderer> = recorder.clone();

        let value = spin_while(renderer, "Sending request", async {
            tokio::time::sleep(SPINNER_TICK * 4).await;
            42
        })
        .await;
        assert_eq!(value, 42);

        let events = recorder.events();
        assert!(recorder.count("spinner:") >= 2, "{events:?}");
        assert_eq!(events.last().map(String::as_str), Some("clear_spinner"));

        // Nothing is drawn once the work is over
        let drawn = events.len();
        tokio::time::sleep(SPINNER_TICK * 3).await;
        assert_eq!(recorder.events().len(), drawn);
    }

    #[tokio::test]
    async fn test_frames_cycle_in_order() {
        let recorder = Arc::new(RecordingRenderer::default());
        let renderer: Arc<dyn Renderer> = recorder.clone();

        spin_while(renderer, "", tokio::time::sleep(Duration::from_millis(300))).await;

        let frames: Vec<String> = recorder
            .events()
            .into_iter()
            .filter_map(|e| e.strip_prefix("spinner:").map(str::to_string))
            .collect();
        assert_eq!(frames[0], SPINNER_FRAMES[0]);
        assert_eq!(frames[1], SPINNER_FRAMES[1]);
    }
}
