use std::cell::RefCell;
use std::rc::Rc;

use js_sys::{Array, Function, Reflect};
use pigeon_widget::voice::{
    CapabilityProvider, EngineSnafu, RecognitionRequest, TranscriptCallback, Utterance,
    VoiceBackend, VoiceError,
};
use wasm_bindgen::JsCast;
use wasm_bindgen::prelude::*;
use web_sys::{SpeechSynthesis, SpeechSynthesisUtterance, SpeechSynthesisVoice, Window};

use crate::storage::describe;

const RECOGNITION_CONSTRUCTOR: &str = "webkitSpeechRecognition";
const RECOGNITION_HANDLERS: [&str; 4] = ["onstart", "onerror", "onend", "onresult"];
const VOICE_BUTTON_ID: &str = "voice-input-button";
const ACTIVE_CLASS: &str = "active";

/// A running recognizer plus the handlers the browser calls back into.
struct RecognitionSession {
    recognizer: JsValue,
    _handlers: Vec<Closure<dyn FnMut(JsValue)>>,
}

impl RecognitionSession {
    fn detach(&self) {
        for handler in RECOGNITION_HANDLERS {
            let _ = Reflect::set(&self.recognizer, &JsValue::from_str(handler), &JsValue::NULL);
        }
        if let Ok(abort) = method(&self.recognizer, "abort") {
            let _ = abort.call0(&self.recognizer);
        }
    }
}

/// Web Speech API engine: `speechSynthesis` for output, `webkitSpeechRecognition` for input.
pub struct BrowserVoice {
    window: Window,
    session: RefCell<Option<RecognitionSession>>,
}

impl BrowserVoice {
    pub fn new(window: Window) -> Self {
        Self {
            window,
            session: RefCell::new(None),
        }
    }

    fn synthesis(&self) -> Option<SpeechSynthesis> {
        self.window.speech_synthesis().ok()
    }

    fn voices(&self) -> Vec<SpeechSynthesisVoice> {
        self.synthesis()
            .map(|synthesis| {
                synthesis
                    .get_voices()
                    .iter()
                    .filter_map(|voice| voice.dyn_into::<SpeechSynthesisVoice>().ok())
                    .collect()
            })
            .unwrap_or_default()
    }

    fn set_button_active(&self, active: bool) {
        set_button_active(&self.window, active);
    }

    fn start_session(
        &self,
        request: &RecognitionRequest,
        on_transcript: TranscriptCallback,
    ) -> Result<RecognitionSession, JsValue> {
        let constructor: Function = Reflect::get(&self.window, &RECOGNITION_CONSTRUCTOR.into())?
            .dyn_into()?;
        let recognizer = Reflect::construct(&constructor, &Array::new())?;

        Reflect::set(&recognizer, &"continuous".into(), &request.continuous.into())?;
        Reflect::set(
            &recognizer,
            &"interimResults".into(),
            &request.interim_results.into(),
        )?;
        Reflect::set(&recognizer, &"lang".into(), &request.language.as_str().into())?;

        let window = self.window.clone();
        let on_start = Closure::<dyn FnMut(JsValue)>::new(move |_event: JsValue| {
            tracing::info!("voice recognition started");
            set_button_active(&window, true);
        });

        let window = self.window.clone();
        let on_error = Closure::<dyn FnMut(JsValue)>::new(move |event: JsValue| {
            let reason = Reflect::get(&event, &"error".into())
                .ok()
                .and_then(|reason| reason.as_string())
                .unwrap_or_default();
            tracing::error!("voice recognition error: {reason}");
            set_button_active(&window, false);
        });

        let window = self.window.clone();
        let on_end = Closure::<dyn FnMut(JsValue)>::new(move |_event: JsValue| {
            tracing::info!("voice recognition ended");
            set_button_active(&window, false);
        });

        let pending = Rc::new(RefCell::new(Some(on_transcript)));
        let on_result = Closure::<dyn FnMut(JsValue)>::new(move |event: JsValue| {
            let Some(transcript) = first_transcript(&event) else {
                tracing::warn!("voice recognition result carried no transcript");
                return;
            };
            tracing::debug!("voice input: {transcript}");
            if let Some(callback) = pending.borrow_mut().take() {
                callback(transcript);
            }
        });

        let handlers = vec![on_start, on_error, on_end, on_result];
        for (name, handler) in RECOGNITION_HANDLERS.iter().zip(&handlers) {
            Reflect::set(&recognizer, &(*name).into(), handler.as_ref())?;
        }

        method(&recognizer, "start")?.call0(&recognizer)?;

        Ok(RecognitionSession {
            recognizer,
            _handlers: handlers,
        })
    }
}

impl CapabilityProvider for BrowserVoice {
    fn supports_voice_input(&self) -> bool {
        Reflect::has(&self.window, &RECOGNITION_CONSTRUCTOR.into()).unwrap_or(false)
    }

    fn supports_voice_output(&self) -> bool {
        Reflect::has(&self.window, &"speechSynthesis".into()).unwrap_or(false)
    }
}

impl VoiceBackend for BrowserVoice {
    fn voice_names(&self) -> Vec<String> {
        self.voices().iter().map(SpeechSynthesisVoice::name).collect()
    }

    fn speak(&self, utterance: Utterance) {
        let Some(synthesis) = self.synthesis() else {
            return;
        };

        let spoken = match SpeechSynthesisUtterance::new_with_text(&utterance.text) {
            Ok(spoken) => spoken,
            Err(error) => {
                tracing::error!("failed to create utterance: {}", describe(&error));
                return;
            }
        };
        spoken.set_lang(&utterance.language);

        if let Some(name) = utterance.voice.as_deref() {
            let voice = self.voices().into_iter().find(|voice| voice.name() == name);
            spoken.set_voice(voice.as_ref());
        }

        synthesis.speak(&spoken);
    }

    fn recognize(
        &self,
        request: RecognitionRequest,
        on_transcript: TranscriptCallback,
    ) -> Result<(), VoiceError> {
        if let Some(previous) = self.session.borrow_mut().take() {
            previous.detach();
            self.set_button_active(false);
        }

        let session = self
            .start_session(&request, on_transcript)
            .map_err(|error| {
                EngineSnafu {
                    stage: "start-recognition",
                    details: describe(&error),
                }
                .build()
            })?;
        *self.session.borrow_mut() = Some(session);
        Ok(())
    }

    fn alert(&self, message: &str) {
        if let Err(error) = self.window.alert_with_message(message) {
            tracing::warn!("failed to show alert: {}", describe(&error));
        }
    }
}

fn method(target: &JsValue, name: &str) -> Result<Function, JsValue> {
    Reflect::get(target, &name.into())?.dyn_into()
}

/// Reads `event.results[0][0].transcript`.
fn first_transcript(event: &JsValue) -> Option<String> {
    let results = Reflect::get(event, &"results".into()).ok()?;
    let result = Reflect::get_u32(&results, 0).ok()?;
    let alternative = Reflect::get_u32(&result, 0).ok()?;
    Reflect::get(&alternative, &"transcript".into())
        .ok()?
        .as_string()
}

fn set_button_active(window: &Window, active: bool) {
    let Some(button) = window
        .document()
        .and_then(|document| document.get_element_by_id(VOICE_BUTTON_ID))
    else {
        return;
    };

    let classes = button.class_list();
    let outcome = if active {
        classes.add_1(ACTIVE_CLASS)
    } else {
        classes.remove_1(ACTIVE_CLASS)
    };
    if let Err(error) = outcome {
        tracing::warn!("failed to update voice button: {}", describe(&error));
    }
}
