//! The editor session: live settings, the active subject, derived palettes,
//! and the preview/export entry points.

use log::{debug, info, warn};
use resvg::tiny_skia::Pixmap;

use crate::background::{Background, PaletteSources, resolve_background};
use crate::color::Palette;
use crate::composition::{Composition, PreviewLayout, SizeF};
use crate::error::{Action, DecodeError, EditorError};
use crate::export::{
    ActionLatch, ClipboardImage, ClipboardPolicy, ClipboardSink, DownloadSink, ExportedFile,
};
use crate::extract::extract_palettes;
use crate::preset::{PresetBank, RandomSource, generate_custom_presets};
use crate::preview::{PreviewCache, PreviewKey};
use crate::raster::encode::{encode_pixmap, encode_rgba};
use crate::raster::{pixmap_to_rgba_image, rasterize};
use crate::settings::{AspectRatio, BackgroundMode, ExportFormat, Settings};
use crate::subject::{CodeSubject, ImageSubject, Subject, SubjectId};

// ============================================================================
// Loading
// ============================================================================

/// Handed out by [`EditorSession::begin_load`]; only the newest ticket may
/// install a subject.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[must_use]
pub struct LoadTicket {
    generation: u64,
}

/// Result of finishing a load.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadOutcome {
    /// The image is now the active subject.
    Installed(SubjectId),
    /// A newer load started in the meantime; the result was dropped.
    Superseded,
}

// ============================================================================
// EditorSession
// ============================================================================

/// Owns all editor state.
///
/// UI code mutates settings through the per-field setters, supplies the
/// measured [`PreviewLayout`], and calls [`export`](Self::export) or
/// [`copy_to_clipboard`](Self::copy_to_clipboard).
///
/// # Example
///
/// ```
/// use snapbeautify_renderer::{EditorSession, SizeF};
///
/// let mut session = EditorSession::new();
/// session.show_code(None);
/// session.set_padding(40.0);
///
/// let layout = session.measure(SizeF::new(640.0, 360.0));
/// let mut downloads = Vec::new();
/// let file = session.export(&layout, 2.0, &mut downloads).unwrap();
/// assert_eq!(file.file_name, "snapbeautify-export.png");
/// ```
pub struct EditorSession {
    settings: Settings,
    subject: Option<(SubjectId, Subject)>,
    next_subject_id: u64,
    load_generation: u64,
    loading: bool,
    extracted: Vec<Palette>,
    static_bank: PresetBank,
    custom_bank: PresetBank,
    clipboard_policy: ClipboardPolicy,
    export_latch: ActionLatch,
    copy_latch: ActionLatch,
    preview_cache: PreviewCache,
    version: u64,
}

impl Default for EditorSession {
    fn default() -> Self {
        Self::new()
    }
}

impl EditorSession {
    /// Creates a session with default settings and a freshly generated
    /// custom preset bank.
    pub fn new() -> Self {
        Self::with_rng(&mut rand::thread_rng())
    }

    /// Like [`new`](Self::new), drawing the custom bank from `rng`.
    pub fn with_rng<R: RandomSource + ?Sized>(rng: &mut R) -> Self {
        Self {
            settings: Settings::default(),
            subject: None,
            next_subject_id: 1,
            load_generation: 0,
            loading: false,
            extracted: Vec::new(),
            static_bank: PresetBank::builtin(),
            custom_bank: generate_custom_presets(rng),
            clipboard_policy: ClipboardPolicy::default(),
            export_latch: ActionLatch::new(Action::Export),
            copy_latch: ActionLatch::new(Action::Copy),
            preview_cache: PreviewCache::new(),
            version: 0,
        }
    }

    /// Bumps the version, invalidating cached previews.
    fn touch(&mut self) {
        self.version = self.version.wrapping_add(1);
    }

    pub fn version(&self) -> u64 {
        self.version
    }

    // ---- Settings ----

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    /// Replaces every setting at once, clamping numeric fields and the
    /// extracted gradient index.
    pub fn apply_settings(&mut self, settings: Settings) {
        self.settings = settings.sanitized();
        let index = self.settings.selected_gradient_index;
        self.settings.selected_gradient_index = self.clamp_gradient_index(index);
        self.touch();
    }

    pub fn set_padding(&mut self, padding: f32) {
        self.settings = std::mem::take(&mut self.settings).with_padding(padding);
        self.touch();
    }

    pub fn set_shadow_intensity(&mut self, intensity: f32) {
        self.settings = std::mem::take(&mut self.settings).with_shadow_intensity(intensity);
        self.touch();
    }

    pub fn set_corner_radius(&mut self, radius: f32) {
        self.settings = std::mem::take(&mut self.settings).with_corner_radius(radius);
        self.touch();
    }

    pub fn set_aspect_ratio(&mut self, aspect_ratio: AspectRatio) {
        self.settings.aspect_ratio = aspect_ratio;
        self.touch();
    }

    pub fn set_export_format(&mut self, format: ExportFormat) {
        self.settings.export_format = format;
    }

    // ---- Backgrounds ----

    /// Selects a built-in preset.
    pub fn select_preset(&mut self, key: impl Into<String>) {
        self.settings.background_mode = BackgroundMode::Preset;
        self.settings.selected_preset_key = key.into();
        self.touch();
    }

    /// Selects a generated preset.
    pub fn select_custom_preset(&mut self, key: impl Into<String>) {
        self.settings.background_mode = BackgroundMode::CustomPreset;
        self.settings.selected_preset_key = key.into();
        self.touch();
    }

    /// Selects an extracted gradient. Out-of-range indices select the first.
    pub fn select_extracted_gradient(&mut self, index: usize) {
        self.settings.background_mode = BackgroundMode::ImageExtracted;
        self.settings.selected_gradient_index = self.clamp_gradient_index(index);
        self.touch();
    }

    fn clamp_gradient_index(&self, index: usize) -> usize {
        if index < self.extracted.len() { index } else { 0 }
    }

    /// Replaces the custom bank and switches to its first preset.
    pub fn regenerate_presets(&mut self) {
        self.regenerate_presets_with(&mut rand::thread_rng());
    }

    pub fn regenerate_presets_with<R: RandomSource + ?Sized>(&mut self, rng: &mut R) {
        self.custom_bank = generate_custom_presets(rng);
        if let Some(first) = self.custom_bank.first_key() {
            self.settings.selected_preset_key = first.to_string();
        }
        self.settings.background_mode = BackgroundMode::CustomPreset;
        self.touch();
    }

    pub fn static_presets(&self) -> &PresetBank {
        &self.static_bank
    }

    pub fn custom_presets(&self) -> &PresetBank {
        &self.custom_bank
    }

    /// Gradients derived from the current image; empty without one.
    pub fn extracted_palettes(&self) -> &[Palette] {
        &self.extracted
    }

    /// The background for the current state.
    pub fn background(&self) -> Background {
        let sources = PaletteSources {
            static_bank: &self.static_bank,
            custom_bank: &self.custom_bank,
            extracted: &self.extracted,
        };
        resolve_background(&self.settings, self.subject.is_some(), sources)
    }

    // ---- Clipboard policy ----

    pub fn clipboard_policy(&self) -> &ClipboardPolicy {
        &self.clipboard_policy
    }

    pub fn set_clipboard_policy(&mut self, policy: ClipboardPolicy) {
        self.clipboard_policy = policy;
    }

    /// Whether copying is offered for the current export format.
    pub fn can_copy(&self) -> bool {
        self.subject.is_some() && self.clipboard_policy.allows(self.settings.export_format)
    }

    // ---- Subject ----

    pub fn subject(&self) -> Option<&Subject> {
        self.subject.as_ref().map(|(_, subject)| subject)
    }

    pub fn subject_id(&self) -> Option<SubjectId> {
        self.subject.as_ref().map(|(id, _)| *id)
    }

    pub fn has_subject(&self) -> bool {
        self.subject.is_some()
    }

    pub fn is_loading(&self) -> bool {
        self.loading
    }

    fn install(&mut self, subject: Subject) -> SubjectId {
        let id = SubjectId(self.next_subject_id);
        self.next_subject_id += 1;
        self.subject = Some((id, subject));
        self.extracted.clear();
        self.settings.selected_gradient_index = 0;
        self.touch();
        id
    }

    /// Starts a load. Any load started earlier is superseded.
    pub fn begin_load(&mut self) -> LoadTicket {
        self.load_generation = self.load_generation.wrapping_add(1);
        self.loading = true;
        LoadTicket {
            generation: self.load_generation,
        }
    }

    /// Finishes the load identified by `ticket`.
    ///
    /// A current ticket clears the loading flag. On success the image
    /// replaces the previous subject, derived palettes are reset and
    /// extracted mode is selected; on failure the subject is left alone.
    pub fn finish_load(
        &mut self,
        ticket: LoadTicket,
        decoded: Result<ImageSubject, DecodeError>,
    ) -> Result<LoadOutcome, EditorError> {
        if ticket.generation != self.load_generation {
            warn!("dropping result of superseded load {}", ticket.generation);
            return Ok(LoadOutcome::Superseded);
        }
        self.loading = false;

        let image = decoded?;
        debug!("installing {}x{} image", image.width(), image.height());
        let id = self.install(Subject::Image(image));
        self.settings.background_mode = BackgroundMode::ImageExtracted;
        Ok(LoadOutcome::Installed(id))
    }

    /// Installs palettes extracted for subject `id`.
    ///
    /// Returns false, leaving state untouched, if `id` is no longer the
    /// active subject.
    pub fn apply_extraction(&mut self, id: SubjectId, palettes: Vec<Palette>) -> bool {
        if self.subject_id() != Some(id) {
            warn!("dropping palettes for replaced subject {}", id.get());
            return false;
        }
        self.extracted = palettes;
        let index = self.settings.selected_gradient_index;
        self.settings.selected_gradient_index = self.clamp_gradient_index(index);
        self.touch();
        true
    }

    /// Decodes `bytes`, installs the image and extracts its palettes.
    pub fn load_image(&mut self, bytes: &[u8]) -> Result<LoadOutcome, EditorError> {
        let ticket = self.begin_load();
        let outcome = self.finish_load(ticket, ImageSubject::decode(bytes))?;
        if let LoadOutcome::Installed(id) = outcome {
            let palettes = match self.subject() {
                Some(Subject::Image(image)) => extract_palettes(&image.pixels),
                _ => Vec::new(),
            };
            self.apply_extraction(id, palettes);
        }
        Ok(outcome)
    }

    /// Switches to code mode, showing `code` or the demo snippet.
    pub fn show_code(&mut self, code: Option<CodeSubject>) -> SubjectId {
        self.install(Subject::Code(code.unwrap_or_default()))
    }

    /// Replaces the text of the active code subject. Returns false outside
    /// code mode.
    pub fn set_code_text(&mut self, text: impl Into<String>) -> bool {
        match self.subject.as_mut() {
            Some((_, Subject::Code(code))) => {
                code.text = text.into();
                self.touch();
                true
            }
            _ => false,
        }
    }

    /// Removes the subject and everything derived from it.
    pub fn clear_subject(&mut self) {
        self.subject = None;
        self.extracted.clear();
        self.settings.selected_gradient_index = 0;
        self.touch();
    }

    // ---- Rendering ----

    /// Lays the preview out inside `viewport` for the current state.
    pub fn measure(&self, viewport: SizeF) -> PreviewLayout {
        PreviewLayout::measure(viewport, &self.settings, self.subject())
    }

    /// Builds the composition for `layout`.
    pub fn composition(&self, layout: &PreviewLayout) -> Result<Composition, EditorError> {
        let subject = self.subject().ok_or(EditorError::NoSubject)?;
        Ok(Composition::new(&self.settings, self.background(), subject, layout)?)
    }

    /// Renders the frame at `dpr`.
    pub fn render(&self, layout: &PreviewLayout, dpr: f32) -> Result<Pixmap, EditorError> {
        let subject = self.subject().ok_or(EditorError::NoSubject)?;
        let composition = Composition::new(&self.settings, self.background(), subject, layout)?;
        Ok(rasterize(&composition, subject, dpr)?)
    }

    /// Renders the live preview at dpr 1, reusing the last frame while
    /// nothing has changed.
    pub fn preview(&mut self, layout: &PreviewLayout) -> Result<&Pixmap, EditorError> {
        let key = PreviewKey::new(layout, 1.0);
        if self.preview_cache.get_cached(key, self.version).is_none() {
            let pixmap = self.render(layout, 1.0)?;
            self.preview_cache.store(key, pixmap, self.version);
        }
        self.preview_cache
            .get_cached(key, self.version)
            .ok_or(EditorError::NoSubject)
    }

    // ---- Export ----

    pub fn is_exporting(&self) -> bool {
        self.export_latch.is_held()
    }

    pub fn is_copying(&self) -> bool {
        self.copy_latch.is_held()
    }

    /// A handle on the export latch, for UI that disables its button.
    pub fn export_latch(&self) -> ActionLatch {
        self.export_latch.clone()
    }

    pub fn copy_latch(&self) -> ActionLatch {
        self.copy_latch.clone()
    }

    /// Renders at `dpr`, encodes in the selected format and delivers the
    /// file to `sink`.
    pub fn export(
        &self,
        layout: &PreviewLayout,
        dpr: f32,
        sink: &mut dyn DownloadSink,
    ) -> Result<ExportedFile, EditorError> {
        if !self.has_subject() {
            return Err(EditorError::NoSubject);
        }
        let _guard = self
            .export_latch
            .try_acquire()
            .ok_or(EditorError::Busy(Action::Export))?;

        let format = self.settings.export_format;
        let pixmap = self.render(layout, dpr)?;
        let file = ExportedFile::new(format, encode_pixmap(&pixmap, format)?);
        sink.deliver(&file)?;
        info!(
            "exported {} ({}x{}, {} bytes)",
            file.file_name,
            pixmap.width(),
            pixmap.height(),
            file.bytes.len()
        );
        Ok(file)
    }

    /// Renders at `dpr` and places the image on the clipboard.
    pub fn copy_to_clipboard(
        &self,
        layout: &PreviewLayout,
        dpr: f32,
        sink: &mut dyn ClipboardSink,
    ) -> Result<(), EditorError> {
        if !self.has_subject() {
            return Err(EditorError::NoSubject);
        }
        let format = self.settings.export_format;
        self.clipboard_policy.check(format)?;
        let _guard = self
            .copy_latch
            .try_acquire()
            .ok_or(EditorError::Busy(Action::Copy))?;

        let pixels = pixmap_to_rgba_image(&self.render(layout, dpr)?);
        let encoded = encode_rgba(&pixels, format)?;
        let item = ClipboardImage {
            pixels,
            format,
            encoded,
        };
        sink.write_image(&item)?;
        info!(
            "copied {}x{} {} image to clipboard",
            item.pixels.width(),
            item.pixels.height(),
            item.mime_type()
        );
        Ok(())
    }
}
