use std::path::PathBuf;

use rand::Rng;

/// Stem used when a base name has no file at all.
pub const PLACEHOLDER_STEM: &str = "cx";

/// Probability of preferring the `_0` variant when it exists.
const PREFER_ZERO_VARIANT: f64 = 0.8;

/// Directory-listing and file-existence collaborator for variant lookup.
pub trait TextureStore {
    /// Stems (no extension) of all `{base}_*` variant files, sorted.
    fn variants(&self, base: &str) -> Vec<String>;

    /// Whether a file for this exact stem exists.
    fn contains(&self, stem: &str) -> bool;
}

/// Filesystem-backed texture store over one source directory.
pub struct TextureDir {
    root: PathBuf,
}

impl TextureDir {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }
}

impl TextureStore for TextureDir {
    fn variants(&self, base: &str) -> Vec<String> {
        let prefix = format!("{base}_");
        let entries = match std::fs::read_dir(&self.root) {
            Ok(entries) => entries,
            Err(_) => return Vec::new(),
        };
        let mut stems: Vec<String> = entries
            .filter_map(|e| e.ok())
            .filter_map(|e| e.file_name().into_string().ok())
            .filter_map(|name| name.strip_suffix(".bmp").map(str::to_string))
            .filter(|stem| stem.starts_with(&prefix))
            .collect();
        stems.sort();
        stems
    }

    fn contains(&self, stem: &str) -> bool {
        self.root.join(format!("{stem}.bmp")).is_file()
    }
}

/// Picks a concrete texture file among a base name's numbered variants.
pub struct VariantResolver<S> {
    store: S,
}

impl<S: TextureStore> VariantResolver<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    /// 80/20 weighted pick: the `_0` variant when present wins 80% of the
    /// time, otherwise a uniform draw among all variants. Without variants
    /// the plain base file is used, and `cx` is the last resort.
    pub fn resolve<R: Rng>(&self, base: &str, rng: &mut R) -> String {
        let variants = self.store.variants(base);
        if !variants.is_empty() {
            let zero = format!("{base}_0");
            if self.store.contains(&zero) && rng.gen::<f64>() < PREFER_ZERO_VARIANT {
                return zero;
            }
            return variants[rng.gen_range(0..variants.len())].clone();
        }
        if self.store.contains(base) {
            return base.to_string();
        }
        PLACEHOLDER_STEM.to_string()
    }
}
