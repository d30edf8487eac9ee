use anyhow::Context;
use egogrid::{ActionRequest, EgocentricObservation, ObservationPipeline, StepReply};
use tracing::{debug, trace, warn};

use crate::{Channel, Recorder};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SessionState {
    /// No episode is running; only `reset()` is allowed.
    AwaitingReset,
    Ready,
}

#[derive(Clone, Debug, PartialEq)]
pub struct StepOutcome {
    pub observation: EgocentricObservation,
    pub reward: f64,
    pub terminated: bool,
}

/// Drives one game over a [`Channel`], turning each reply into an
/// observation.
pub struct ObservationSession<C> {
    channel: C,
    pipeline: ObservationPipeline,
    recorder: Option<Recorder>,
    state: SessionState,
    latest: Option<EgocentricObservation>,
}

impl<C: Channel> ObservationSession<C> {
    pub fn new(channel: C, pipeline: ObservationPipeline) -> Self {
        Self {
            channel,
            pipeline,
            recorder: None,
            state: SessionState::AwaitingReset,
            latest: None,
        }
    }

    pub fn with_recorder(mut self, recorder: Recorder) -> Self {
        self.recorder = Some(recorder);
        self
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn pipeline(&self) -> &ObservationPipeline {
        &self.pipeline
    }

    /// The observation of the most recent successful exchange.
    pub fn latest_observation(&self) -> Option<&EgocentricObservation> {
        self.latest.as_ref()
    }

    /// Starts a new episode. The reward and termination flag of the reply
    /// are ignored.
    pub fn reset(&mut self) -> anyhow::Result<EgocentricObservation> {
        self.try_write_recording();
        let outcome = self.send(&ActionRequest::reset())?;
        self.state = SessionState::Ready;
        debug!("Episode started");
        Ok(outcome.observation)
    }

    pub fn step(&mut self, action: &ActionRequest) -> anyhow::Result<StepOutcome> {
        if self.state == SessionState::AwaitingReset {
            anyhow::bail!("The session must be reset before stepping");
        }
        if action.0.is_empty() {
            anyhow::bail!("Empty action vector");
        }
        if action.is_reset() {
            anyhow::bail!("The action {:?} is indistinguishable from a reset", action.0);
        }
        let outcome = self.send(action)?;
        if outcome.terminated {
            self.state = SessionState::AwaitingReset;
            self.try_write_recording();
        }
        Ok(outcome)
    }

    /// Writes out the exchanges of an unfinished episode, if any.
    pub fn finish(&mut self) -> anyhow::Result<()> {
        self.write_recording()
    }

    fn send(&mut self, action: &ActionRequest) -> anyhow::Result<StepOutcome> {
        let request = action.to_json();
        let reply = self.channel.exchange(&request)?;
        if let Some(recorder) = &mut self.recorder {
            recorder.store_exchange(&request, &reply);
        }
        let reply = StepReply::from_json(&reply).context("Could not decode the game's reply")?;
        let observation = self
            .pipeline
            .observe_record(reply.state())
            .context("Could not build an observation from the game's reply")?;
        self.latest = Some(observation.clone());
        Ok(StepOutcome {
            observation,
            reward: reply.reward(),
            terminated: reply.terminated(),
        })
    }

    /// Recording failures must not cost the caller an outcome; the
    /// exchanges stay pending and are retried on the next attempt.
    fn try_write_recording(&mut self) {
        if let Err(err) = self.write_recording() {
            warn!("Could not write the episode recording: {:#}", err);
        }
    }

    fn write_recording(&mut self) -> anyhow::Result<()> {
        if let Some(recorder) = &mut self.recorder {
            if recorder.has_pending_exchanges() {
                let path = recorder.write_episode_recording()?;
                trace!(path = %path.display(), "Wrote episode recording");
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::collections::VecDeque;

    use egogrid::{Anchor, PipelineConfig, TerrainPadding};

    use super::*;

    /// Answers every request with the next scripted reply.
    struct ScriptedChannel {
        replies: VecDeque<String>,
        requests: Vec<String>,
    }

    impl ScriptedChannel {
        fn new(replies: &[String]) -> Self {
            Self {
                replies: replies.iter().cloned().collect(),
                requests: Vec::new(),
            }
        }
    }

    impl Channel for ScriptedChannel {
        fn exchange(&mut self, request: &str) -> anyhow::Result<String> {
            self.requests.push(String::from(request));
            self.replies
                .pop_front()
                .ok_or_else(|| anyhow::anyhow!("No more replies"))
        }
    }

    fn reply(player_x: u32, reward: f64, terminated: bool) -> String {
        format!(
            concat!(
                r#"[{{"entities":[{{"Name":"Celeste.Player","#,
                r#""Left":"{}","Right":"{}","Top":"8","Bottom":"16"}}],"#,
                r#""bounds":"{{X:0 Y:0 Width:32 Height:32}}","#,
                r#""solids":"0000\n0000\n0000\n1111","#,
                r#""climbing":false,"canDash":true,"speed":"0, 0"}},{},{}]"#
            ),
            player_x,
            player_x + 8,
            reward,
            terminated
        )
    }

    fn pipeline() -> ObservationPipeline {
        ObservationPipeline::new(PipelineConfig {
            scale: 1,
            vision_size: 4,
            terrain_padding: TerrainPadding::Solid,
            ..PipelineConfig::default()
        })
        .unwrap()
    }

    #[test]
    fn reset_then_step_until_termination() {
        let channel = ScriptedChannel::new(&[
            reply(0, 0.0, false),
            reply(8, 0.5, false),
            reply(16, 1.0, true),
        ]);
        let mut session = ObservationSession::new(channel, pipeline());
        assert_eq!(session.state(), SessionState::AwaitingReset);
        assert!(session.latest_observation().is_none());

        let observation = session.reset().unwrap();
        // Player at tile (1, 0), padding 3
        assert_eq!(observation.anchor, Anchor::Player { row: 4, col: 3 });
        assert_eq!(observation.grid.shape(), (10, 4, 4));
        assert_eq!(session.state(), SessionState::Ready);

        let outcome = session.step(&ActionRequest(vec![0.5, -1.0])).unwrap();
        assert_eq!(outcome.reward, 0.5);
        assert!(!outcome.terminated);
        assert_eq!(outcome.observation.anchor, Anchor::Player { row: 4, col: 4 });

        let outcome = session.step(&ActionRequest(vec![0.0, 0.0])).unwrap();
        assert!(outcome.terminated);
        assert_eq!(session.state(), SessionState::AwaitingReset);
        assert_eq!(session.latest_observation(), Some(&outcome.observation));
        assert!(session.step(&ActionRequest(vec![0.0, 0.0])).is_err());

        assert_eq!(session.channel.requests, vec!["[1]", "[0.5,-1.0]", "[0.0,0.0]"]);
    }

    #[test]
    fn step_requires_reset() {
        let channel = ScriptedChannel::new(&[reply(0, 0.0, false)]);
        let mut session = ObservationSession::new(channel, pipeline());
        assert!(session.step(&ActionRequest(vec![0.0])).is_err());
        assert!(session.channel.requests.is_empty());
    }

    #[test]
    fn ambiguous_actions_are_rejected() {
        let channel = ScriptedChannel::new(&[reply(0, 0.0, false)]);
        let mut session = ObservationSession::new(channel, pipeline());
        session.reset().unwrap();
        assert!(session.step(&ActionRequest(vec![])).is_err());
        assert!(session.step(&ActionRequest(vec![1.0])).is_err());
        assert_eq!(session.channel.requests.len(), 1);
        assert_eq!(session.state(), SessionState::Ready);
    }

    #[test]
    fn bad_reply_keeps_state() {
        let channel = ScriptedChannel::new(&[
            reply(0, 0.0, false),
            String::from("[{}, 0.0, false]"),
            String::from(r#"[{"bounds":"{X:0 Y:0 Width:32}","solids":""},0.0,true]"#),
            reply(8, 0.0, false),
        ]);
        let mut session = ObservationSession::new(channel, pipeline());
        let first = session.reset().unwrap();

        assert!(session.step(&ActionRequest(vec![0.0, 0.0])).is_err());
        assert_eq!(session.state(), SessionState::Ready);
        // A terminating reply that cannot be decoded does not end the episode
        assert!(session.step(&ActionRequest(vec![0.0, 0.0])).is_err());
        assert_eq!(session.state(), SessionState::Ready);
        assert_eq!(session.latest_observation(), Some(&first));

        assert!(session.step(&ActionRequest(vec![0.0, 0.0])).is_ok());
    }

    #[test]
    fn episodes_are_recorded() {
        let directory =
            std::env::temp_dir().join(format!("egogrid_session_{}", std::process::id()));
        std::fs::create_dir_all(&directory).unwrap();
        let channel = ScriptedChannel::new(&[
            reply(0, 0.0, false),
            reply(8, 1.0, true),
            reply(0, 0.0, false),
        ]);
        let recorder = Recorder::new(directory.clone()).unwrap();
        let mut session = ObservationSession::new(channel, pipeline()).with_recorder(recorder);
        session.reset().unwrap();
        session.step(&ActionRequest(vec![0.25, 0.0])).unwrap();
        assert!(directory.join("episode_000001.json").is_file());
        session.reset().unwrap();
        session.finish().unwrap();

        let second = crate::EpisodeRecording::load(&directory.join("episode_000002.json")).unwrap();
        assert_eq!(second.len(), 1);
        assert_eq!(second.into_pairs()[0].0, "[1]");
        std::fs::remove_dir_all(&directory).unwrap();
    }

    #[test]
    fn failed_recording_keeps_the_outcome() {
        let directory =
            std::env::temp_dir().join(format!("egogrid_lost_dir_{}", std::process::id()));
        std::fs::create_dir_all(&directory).unwrap();
        let channel = ScriptedChannel::new(&[reply(0, 0.0, false), reply(8, 2.0, true)]);
        let recorder = Recorder::new(directory.clone()).unwrap();
        let mut session = ObservationSession::new(channel, pipeline()).with_recorder(recorder);
        session.reset().unwrap();
        std::fs::remove_dir_all(&directory).unwrap();

        let outcome = session.step(&ActionRequest(vec![0.0, 0.0])).unwrap();
        assert!(outcome.terminated);
        assert_eq!(outcome.reward, 2.0);
        assert_eq!(session.state(), SessionState::AwaitingReset);
        // Still pending, so finishing reports the failure
        assert!(session.finish().is_err());
    }
}
