use std::rc::Rc;

use snafu::Snafu;

use crate::settings::{SessionConfig, WidgetSettings};

pub const RECOGNITION_UNSUPPORTED_ALERT: &str =
    "Your browser does not support speech recognition. Please try Google Chrome.";
pub const SYNTHESIS_UNSUPPORTED_ALERT: &str =
    "Your browser does not support speech synthesis. Please try Google Chrome.";

/// Reports which speech features the host environment offers.
pub trait CapabilityProvider {
    fn supports_voice_input(&self) -> bool;
    fn supports_voice_output(&self) -> bool;
}

/// Receives the final transcript of one recognition session.
pub type TranscriptCallback = Box<dyn FnOnce(String)>;

/// Speech engine seam: synthesis, recognition and blocking user alerts.
pub trait VoiceBackend: CapabilityProvider {
    fn voice_names(&self) -> Vec<String>;
    fn speak(&self, utterance: Utterance);
    fn recognize(
        &self,
        request: RecognitionRequest,
        on_transcript: TranscriptCallback,
    ) -> Result<(), VoiceError>;
    fn alert(&self, message: &str);
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Utterance {
    pub text: String,
    pub language: String,
    pub voice: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecognitionRequest {
    pub language: String,
    pub continuous: bool,
    pub interim_results: bool,
}

#[derive(Debug, Snafu)]
#[snafu(visibility(pub))]
pub enum VoiceError {
    #[snafu(display("speech engine failed on `{stage}`: {details}"))]
    Engine {
        stage: &'static str,
        details: String,
    },
}

/// Applies widget preferences on top of a [`VoiceBackend`].
#[derive(Clone)]
pub struct VoiceService {
    backend: Rc<dyn VoiceBackend>,
    language: String,
    preferred_voices: Vec<String>,
}

impl VoiceService {
    pub fn new(backend: Rc<dyn VoiceBackend>, settings: &WidgetSettings) -> Self {
        Self {
            backend,
            language: settings.language.clone(),
            preferred_voices: settings.preferred_voices.clone(),
        }
    }

    /// Reads `text` aloud, remembering the chosen voice in `session`.
    pub fn speak(&self, text: &str, session: &mut SessionConfig) {
        if !self.backend.supports_voice_output() {
            self.backend.alert(SYNTHESIS_UNSUPPORTED_ALERT);
            return;
        }

        // A previously selected voice stays in use when no preferred voice is listed yet.
        if let Some(voice) = self.preferred_voice() {
            session.selected_voice = Some(voice);
        }

        self.backend.speak(Utterance {
            text: text.to_string(),
            language: self.language.clone(),
            voice: session.selected_voice.clone(),
        });
    }

    /// Starts one recognition session; returns false when none was started.
    pub fn listen(&self, on_transcript: TranscriptCallback) -> bool {
        if !self.backend.supports_voice_input() {
            self.backend.alert(RECOGNITION_UNSUPPORTED_ALERT);
            return false;
        }

        let request = RecognitionRequest {
            language: self.language.clone(),
            continuous: false,
            interim_results: false,
        };

        match self.backend.recognize(request, on_transcript) {
            Ok(()) => true,
            Err(error) => {
                tracing::error!("voice recognition failed to start: {error}");
                false
            }
        }
    }

    fn preferred_voice(&self) -> Option<String> {
        self.backend
            .voice_names()
            .into_iter()
            .find(|name| self.preferred_voices.iter().any(|preferred| preferred == name))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::ScriptedVoice;

    fn service(voice: &Rc<ScriptedVoice>) -> VoiceService {
        VoiceService::new(voice.clone(), &WidgetSettings::default())
    }

    #[test]
    fn speak_picks_first_listed_preferred_voice() {
        let voice = Rc::new(ScriptedVoice::supported().with_voices(&[
            "Alex",
            "Microsoft Zira Desktop - English (United States)",
            "Google UK English Female",
        ]));
        let mut session = SessionConfig::default();

        service(&voice).speak("hello", &mut session);

        let spoken = voice.spoken();
        assert_eq!(spoken.len(), 1);
        assert_eq!(
            spoken[0].voice.as_deref(),
            Some("Microsoft Zira Desktop - English (United States)")
        );
        assert_eq!(spoken[0].language, "en-US");
        assert_eq!(session.selected_voice, spoken[0].voice);
    }

    #[test]
    fn speak_reuses_remembered_voice_when_none_is_listed() {
        let voice = Rc::new(ScriptedVoice::supported());
        let mut session = SessionConfig {
            read_aloud: true,
            selected_voice: Some("Google UK English Female".to_string()),
        };

        service(&voice).speak("again", &mut session);

        assert_eq!(
            voice.spoken()[0].voice.as_deref(),
            Some("Google UK English Female")
        );
    }

    #[test]
    fn unsupported_engines_alert_instead_of_running() {
        let voice = Rc::new(ScriptedVoice::unsupported());
        let service = service(&voice);

        service.speak("hello", &mut SessionConfig::default());
        let started = service.listen(Box::new(|_| panic!("no transcript expected")));

        assert!(!started);
        assert!(voice.spoken().is_empty());
        assert_eq!(
            voice.alerts(),
            vec![
                SYNTHESIS_UNSUPPORTED_ALERT.to_string(),
                RECOGNITION_UNSUPPORTED_ALERT.to_string()
            ]
        );
    }

    #[test]
    fn listen_requests_single_final_result() {
        let voice = Rc::new(ScriptedVoice::supported().with_transcript("what time is it"));
        let heard = Rc::new(std::cell::RefCell::new(None));
        let sink = heard.clone();

        let started = service(&voice).listen(Box::new(move |text| {
            *sink.borrow_mut() = Some(text);
        }));

        assert!(started);
        assert_eq!(heard.borrow().as_deref(), Some("what time is it"));
        let request = voice.recognitions()[0].clone();
        assert!(!request.continuous);
        assert!(!request.interim_results);
    }
}
