//! Bounce Loop entry point
//!
//! Web: wires the simulation to a canvas, the collision chime, pointer and
//! keyboard input, and downloads finished recordings.
//! Native: runs a headless batch and writes the recordings to disk.

#[cfg(target_arch = "wasm32")]
use wasm_bindgen::prelude::*;

#[cfg(target_arch = "wasm32")]
mod wasm_app {
    use std::cell::{Cell, RefCell};
    use std::rc::Rc;

    use glam::Vec2;
    use wasm_bindgen::prelude::*;
    use web_sys::{
        Blob, BlobPropertyBag, HtmlAnchorElement, HtmlCanvasElement, MouseEvent, TouchEvent, Url,
    };

    use bounce_loop::audio::CollisionChime;
    use bounce_loop::batch::BatchOrchestrator;
    use bounce_loop::capture::MediaRecorderBackend;
    use bounce_loop::platform::web::{PerformanceClock, RafScheduler, TimeoutTimer};
    use bounce_loop::renderer::CanvasSurface;
    use bounce_loop::{
        BatchHost, CaptureArtifact, CaptureError, CaptureSession, CompletionCallback, LabelEntity,
        SetupError, Settings, Simulation,
    };

    type WebSim = Simulation<CanvasSurface, RafScheduler, PerformanceClock, MediaRecorderBackend>;

    /// Simulation plus the collaborators the page wires around it
    struct App {
        sim: WebSim,
        chime: Rc<RefCell<CollisionChime>>,
        downloads: Rc<Cell<u32>>,
        settings: Settings,
    }

    impl App {
        /// Start or stop a manual recording; the result is downloaded
        fn toggle_capture(&mut self) {
            if self.sim.is_capturing() {
                self.sim.stop_capture();
                return;
            }
            let downloads = self.downloads.clone();
            let on_complete: CompletionCallback =
                Box::new(move |artifact| save_artifact(&artifact, &downloads));
            if let Err(e) = self.sim.start_capture(on_complete, None) {
                log::error!("{}", e);
            }
        }

        fn reset(&mut self) {
            self.chime.borrow_mut().reset();
            self.sim.reset();
        }

        /// Flip the chime mute and remember it across page loads
        fn toggle_mute(&mut self) {
            let muted = !self.chime.borrow().is_muted();
            self.chime.borrow_mut().set_muted(muted);
            self.settings.muted = muted;
            self.settings.save();
            log::info!("Chime {}", if muted { "muted" } else { "unmuted" });
        }
    }

    impl BatchHost for App {
        fn reset_run(&mut self) {
            self.chime.borrow_mut().reset();
            self.sim.reset_run();
        }

        fn is_capturing(&self) -> bool {
            self.sim.is_capturing()
        }

        fn begin_capture(&mut self, on_complete: CompletionCallback) -> Result<(), CaptureError> {
            self.sim.begin_capture(on_complete)
        }

        fn end_capture(&mut self) {
            self.sim.end_capture();
        }
    }

    fn save_artifact(artifact: &CaptureArtifact, downloads: &Cell<u32>) {
        let n = downloads.get() + 1;
        downloads.set(n);
        let name = format!("bounce-{}.{}", n, artifact.extension());
        match download(artifact, &name) {
            Ok(()) => log::info!("Downloaded {} ({} bytes)", name, artifact.len()),
            Err(e) => log::error!("Download of {} failed: {:?}", name, e),
        }
    }

    const REVOKE_DELAY_MS: i32 = 1000;

    /// Hand the bytes to the browser through an object URL
    fn download(artifact: &CaptureArtifact, name: &str) -> Result<(), JsValue> {
        let bytes = js_sys::Uint8Array::from(artifact.data.as_slice());
        let parts = js_sys::Array::new();
        parts.push(&bytes);
        let bag = BlobPropertyBag::new();
        bag.set_type(&artifact.mime_type);
        let blob = Blob::new_with_u8_array_sequence_and_options(&parts, &bag)?;
        let url = Url::create_object_url_with_blob(&blob)?;

        let document = web_sys::window()
            .and_then(|w| w.document())
            .ok_or_else(|| JsValue::from_str("no document"))?;
        let anchor: HtmlAnchorElement = document
            .create_element("a")?
            .dyn_into()
            .map_err(JsValue::from)?;
        anchor.set_href(&url);
        anchor.set_download(name);
        anchor.click();

        // The browser must start the download before the URL is revoked
        let window = web_sys::window().ok_or_else(|| JsValue::from_str("no window"))?;
        let revoke = Closure::once_into_js(move || {
            let _ = Url::revoke_object_url(&url);
        });
        window.set_timeout_with_callback_and_timeout_and_arguments_0(
            revoke.unchecked_ref(),
            REVOKE_DELAY_MS,
        )?;
        Ok(())
    }

    /// Client coordinates -> canvas pixel coordinates
    fn canvas_point(canvas: &HtmlCanvasElement, client_x: i32, client_y: i32) -> Vec2 {
        let rect = canvas.get_bounding_client_rect();
        let scale_x = if rect.width() > 0.0 {
            canvas.width() as f64 / rect.width()
        } else {
            1.0
        };
        let scale_y = if rect.height() > 0.0 {
            canvas.height() as f64 / rect.height()
        } else {
            1.0
        };
        Vec2::new(
            ((client_x as f64 - rect.left()) * scale_x) as f32,
            ((client_y as f64 - rect.top()) * scale_y) as f32,
        )
    }

    pub async fn run() -> Result<(), SetupError> {
        console_error_panic_hook::set_once();
        if let Err(e) = console_log::init_with_level(log::Level::Info) {
            web_sys::console::warn_1(&format!("Logger unavailable: {}", e).into());
        }

        log::info!("Bounce Loop starting...");

        let document = web_sys::window()
            .and_then(|w| w.document())
            .ok_or_else(|| SetupError::SurfaceUnavailable("no document".into()))?;

        let canvas: HtmlCanvasElement = document
            .get_element_by_id("canvas")
            .ok_or_else(|| SetupError::SurfaceUnavailable("no #canvas element".into()))?
            .dyn_into()
            .map_err(|_| SetupError::SurfaceUnavailable("#canvas is not a canvas".into()))?;

        let settings = Settings::load();
        let seed = settings.seed.unwrap_or_else(|| js_sys::Date::now() as u64);

        let labels = match canvas.get_attribute("data-labels") {
            Some(json) => LabelEntity::list_from_json(&json).unwrap_or_else(|e| {
                log::warn!("Ignoring malformed labels: {}", e);
                Vec::new()
            }),
            None => Vec::new(),
        };

        let backend = MediaRecorderBackend::new(canvas.clone(), &settings.capture.mime_type)?;
        let chime = Rc::new(RefCell::new(CollisionChime::new(
            backend.audio_context().clone(),
            backend.audio_destination().clone(),
        )));
        chime.borrow_mut().set_muted(settings.muted);

        let on_collision = {
            let chime = chime.clone();
            Box::new(move || chime.borrow_mut().play()) as Box<dyn FnMut()>
        };

        let sim = Simulation::new(
            CanvasSurface::new(canvas.clone())?,
            RafScheduler::new(),
            PerformanceClock,
            CaptureSession::new(backend, settings.frame_rate()),
            settings.tuning,
            labels,
            Some(on_collision),
            seed,
        )?;
        log::info!("Simulation initialized with seed: {}", seed);

        let orchestrator = Rc::new(BatchOrchestrator::new(settings.batch, TimeoutTimer));

        let app = Rc::new(RefCell::new(App {
            sim,
            chime,
            downloads: Rc::new(Cell::new(0)),
            settings,
        }));

        // Frame callback; the scheduler reuses it for every request
        {
            let frame_app = app.clone();
            let closure = Closure::<dyn FnMut(f64)>::new(move |_time: f64| {
                frame_app.borrow_mut().sim.on_frame();
            });
            app.borrow_mut().sim.scheduler_mut().set_callback(closure);
        }


        setup_pointer_handlers(&canvas, app.clone());
        setup_keyboard(app.clone(), orchestrator);

        app.borrow_mut().sim.start();
        log::info!("Bounce Loop running!");
        Ok(())
    }

    fn setup_pointer_handlers(canvas: &HtmlCanvasElement, app: Rc<RefCell<App>>) {
        // Mouse down - grab the ball
        {
            let app = app.clone();
            let canvas_clone = canvas.clone();
            let closure = Closure::<dyn FnMut(_)>::new(move |event: MouseEvent| {
                let pos = canvas_point(&canvas_clone, event.client_x(), event.client_y());
                let mut a = app.borrow_mut();
                a.chime.borrow().resume();
                a.sim.pointer_down(pos);
            });
            let _ = canvas
                .add_event_listener_with_callback("mousedown", closure.as_ref().unchecked_ref());
            closure.forget();
        }

        // Mouse move - drag
        {
            let app = app.clone();
            let canvas_clone = canvas.clone();
            let closure = Closure::<dyn FnMut(_)>::new(move |event: MouseEvent| {
                let pos = canvas_point(&canvas_clone, event.client_x(), event.client_y());
                app.borrow_mut().sim.pointer_move(pos);
            });
            let _ = canvas
                .add_event_listener_with_callback("mousemove", closure.as_ref().unchecked_ref());
            closure.forget();
        }

        // Mouse up anywhere releases the ball
        {
            let app = app.clone();
            let closure = Closure::<dyn FnMut(_)>::new(move |_event: MouseEvent| {
                app.borrow_mut().sim.pointer_up();
            });
            if let Some(window) = web_sys::window() {
                let _ = window
                    .add_event_listener_with_callback("mouseup", closure.as_ref().unchecked_ref());
            }
            closure.forget();
        }

        // Touch start
        {
            let app = app.clone();
            let canvas_clone = canvas.clone();
            let closure = Closure::<dyn FnMut(_)>::new(move |event: TouchEvent| {
                if let Some(touch) = event.touches().get(0) {
                    let pos = canvas_point(&canvas_clone, touch.client_x(), touch.client_y());
                    let mut a = app.borrow_mut();
                    a.chime.borrow().resume();
                    if a.sim.pointer_down(pos) {
                        event.prevent_default();
                    }
                }
            });
            let _ = canvas
                .add_event_listener_with_callback("touchstart", closure.as_ref().unchecked_ref());
            closure.forget();
        }

        // Touch move
        {
            let app = app.clone();
            let canvas_clone = canvas.clone();
            let closure = Closure::<dyn FnMut(_)>::new(move |event: TouchEvent| {
                if let Some(touch) = event.touches().get(0) {
                    let mut a = app.borrow_mut();
                    if a.sim.is_dragging() {
                        event.prevent_default();
                        let pos = canvas_point(&canvas_clone, touch.client_x(), touch.client_y());
                        a.sim.pointer_move(pos);
                    }
                }
            });
            let _ = canvas
                .add_event_listener_with_callback("touchmove", closure.as_ref().unchecked_ref());
            closure.forget();
        }

        // Touch end
        {
            let closure = Closure::<dyn FnMut(_)>::new(move |_event: TouchEvent| {
                app.borrow_mut().sim.pointer_up();
            });
            let _ = canvas
                .add_event_listener_with_callback("touchend", closure.as_ref().unchecked_ref());
            closure.forget();
        }
    }

    fn setup_keyboard(app: Rc<RefCell<App>>, orchestrator: Rc<BatchOrchestrator<TimeoutTimer>>) {
        let Some(window) = web_sys::window() else {
            return;
        };
        let closure = Closure::<dyn FnMut(_)>::new(move |event: web_sys::KeyboardEvent| {
            match event.key().as_str() {
                " " => {
                    event.prevent_default();
                    let mut a = app.borrow_mut();
                    a.chime.borrow().resume();
                    if a.sim.is_running() {
                        a.sim.stop();
                    } else {
                        a.sim.start();
                    }
                }
                "r" | "R" => app.borrow_mut().reset(),
                "c" | "C" => {
                    if orchestrator.is_active() {
                        log::warn!("Batch running, manual capture disabled");
                        return;
                    }
                    let mut a = app.borrow_mut();
                    a.chime.borrow().resume();
                    a.toggle_capture();
                }
                "m" | "M" => app.borrow_mut().toggle_mute(),
                "b" | "B" => start_batch(app.clone(), orchestrator.clone()),
                _ => {}
            }
        });
        let _ =
            window.add_event_listener_with_callback("keydown", closure.as_ref().unchecked_ref());
        closure.forget();
    }

    fn start_batch(app: Rc<RefCell<App>>, orchestrator: Rc<BatchOrchestrator<TimeoutTimer>>) {
        if orchestrator.is_active() {
            let (done, total) = orchestrator.progress();
            log::info!("Batch in progress: {}/{}", done, total);
            return;
        }
        app.borrow().chime.borrow().resume();

        wasm_bindgen_futures::spawn_local(async move {
            match orchestrator.run(&*app).await {
                Ok(artifacts) => {
                    let downloads = app.borrow().downloads.clone();
                    for artifact in &artifacts {
                        save_artifact(artifact, &downloads);
                    }
                }
                Err(e) => log::error!("Batch failed: {}", e),
            }
        });
    }
}

#[cfg(target_arch = "wasm32")]
#[wasm_bindgen(start)]
pub async fn wasm_main() {
    if let Err(e) = wasm_app::run().await {
        log::error!("Startup failed: {}", e);
    }
}

#[cfg(target_arch = "wasm32")]
fn main() {
    // WASM entry point is wasm_main, this is just to satisfy the compiler
}

#[cfg(not(target_arch = "wasm32"))]
mod headless_app {
    use std::cell::{Cell, RefCell};
    use std::error::Error;
    use std::path::PathBuf;
    use std::rc::Rc;

    use bounce_loop::batch::BatchOrchestrator;
    use bounce_loop::capture::CommandRecorder;
    use bounce_loop::platform::{InstantTimer, ManualClock, ManualScheduler};
    use bounce_loop::renderer::RecordingSurface;
    use bounce_loop::{CaptureSession, Settings, Simulation};

    /// Portrait short-form video size
    const WIDTH: f32 = 1080.0;
    const HEIGHT: f32 = 1920.0;

    /// `bounce-loop [settings.json] [output-dir]`
    pub fn run() -> Result<(), Box<dyn Error>> {
        let mut args = std::env::args().skip(1);
        let settings = match args.next() {
            Some(path) => {
                log::info!("Loading settings from {}", path);
                Settings::from_json(&std::fs::read_to_string(&path)?)?
            }
            None => Settings::load(),
        };
        let out_dir = PathBuf::from(args.next().unwrap_or_else(|| ".".to_string()));
        std::fs::create_dir_all(&out_dir)?;

        let seed = settings.seed.unwrap_or_else(rand::random);
        let frame_rate = settings.frame_rate();
        let scheduler = ManualScheduler::new();
        let clock = ManualClock::new(0.0);

        let collisions = Rc::new(Cell::new(0u64));
        let counter = collisions.clone();

        let sim = Simulation::new(
            RecordingSurface::new(WIDTH, HEIGHT),
            scheduler.clone(),
            clock.clone(),
            CaptureSession::new(CommandRecorder::new(), frame_rate),
            settings.tuning,
            Vec::new(),
            Some(Box::new(move || counter.set(counter.get() + 1))),
            seed,
        )?;
        let sim = Rc::new(RefCell::new(sim));
        log::info!("Headless simulation with seed {}", seed);

        // Every wait plays the frames that would have been shown meanwhile
        let pump = sim.clone();
        let frame_ms = 1000.0 / frame_rate as f64;
        let timer = InstantTimer::with_hook(move |duration| {
            let frames = (duration.as_secs_f64() * frame_rate as f64).round() as u64;
            for _ in 0..frames {
                if scheduler.take_pending().is_none() {
                    break;
                }
                clock.advance(frame_ms);
                pump.borrow_mut().on_frame();
            }
        });

        let orchestrator = BatchOrchestrator::new(settings.batch, timer);
        let artifacts = pollster::block_on(orchestrator.run(&*sim))?;

        for (i, artifact) in artifacts.iter().enumerate() {
            let path = out_dir.join(format!("bounce-{}.{}", i + 1, artifact.extension()));
            std::fs::write(&path, &artifact.data)?;
            log::info!("Wrote {} ({} bytes)", path.display(), artifact.len());
        }
        log::info!(
            "Done: {} recordings, {} collisions",
            artifacts.len(),
            collisions.get()
        );
        Ok(())
    }
}

#[cfg(not(target_arch = "wasm32"))]
fn main() {
    env_logger::init();
    log::info!("Bounce Loop (headless) starting...");

    if let Err(e) = headless_app::run() {
        log::error!("{}", e);
        std::process::exit(1);
    }
}
