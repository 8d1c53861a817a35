//! In-memory Typst world: one main source, an optional cover image, and
//! the fonts bundled with `typst-assets`.

use chrono::{Datelike, Duration, Timelike, Utc};
use std::sync::OnceLock;
use typst::diag::{FileError, FileResult};
use typst::foundations::{Array, Bytes, Datetime, Dict, Value};
use typst::syntax::{FileId, Source, VirtualPath};
use typst::text::{Font, FontBook};
use typst::utils::LazyHash;
use typst::{Library, World};

static FONT_CACHE: OnceLock<FontCache> = OnceLock::new();

pub(crate) fn font_cache() -> &'static FontCache {
    FONT_CACHE.get_or_init(FontCache::load)
}

pub(crate) struct FontCache {
    book: LazyHash<FontBook>,
    fonts: Vec<Font>,
}

impl FontCache {
    fn load() -> Self {
        let mut book = FontBook::new();
        let mut fonts = Vec::new();
        for data in typst_assets::fonts() {
            for font in Font::iter(Bytes::from_static(data)) {
                book.push(font.info().clone());
                fonts.push(font);
            }
        }
        log::debug!("Loaded {} embedded fonts", fonts.len());
        Self {
            book: LazyHash::new(book),
            fonts,
        }
    }
}

pub(crate) struct BookWorld {
    main: Source,
    cover_id: FileId,
    cover: Option<Bytes>,
    library: LazyHash<Library>,
    fonts: &'static FontCache,
    now: chrono::DateTime<Utc>,
}

impl BookWorld {
    pub(crate) fn new(template: &str, inputs: Dict, cover_path: &str, cover: Option<Vec<u8>>) -> Self {
        let main_id = FileId::new(None, VirtualPath::new("/main.typ"));
        Self {
            main: Source::new(main_id, template.to_string()),
            cover_id: FileId::new(None, VirtualPath::new(cover_path)),
            cover: cover.map(Bytes::from),
            library: LazyHash::new(Library::builder().with_inputs(inputs).build()),
            fonts: font_cache(),
            now: Utc::now(),
        }
    }
}

impl World for BookWorld {
    fn library(&self) -> &LazyHash<Library> {
        &self.library
    }

    fn book(&self) -> &LazyHash<FontBook> {
        &self.fonts.book
    }

    fn main(&self) -> FileId {
        self.main.id()
    }

    fn source(&self, id: FileId) -> FileResult<Source> {
        if id == self.main.id() {
            Ok(self.main.clone())
        } else {
            Err(FileError::NotFound(id.vpath().as_rootless_path().into()))
        }
    }

    fn file(&self, id: FileId) -> FileResult<Bytes> {
        match &self.cover {
            Some(bytes) if id == self.cover_id => Ok(bytes.clone()),
            _ => Err(FileError::NotFound(id.vpath().as_rootless_path().into())),
        }
    }

    fn font(&self, index: usize) -> Option<Font> {
        self.fonts.fonts.get(index).cloned()
    }

    fn today(&self, offset: Option<i64>) -> Option<Datetime> {
        let now = self.now + Duration::hours(offset.unwrap_or(0));
        Datetime::from_ymd_hms(
            now.year(),
            now.month() as u8,
            now.day() as u8,
            now.hour() as u8,
            now.minute() as u8,
            now.second() as u8,
        )
    }
}

/// Converts a JSON tree into the Typst values exposed through `sys.inputs`.
pub(crate) fn json_to_value(json: &serde_json::Value) -> Value {
    match json {
        serde_json::Value::Null => Value::None,
        serde_json::Value::Bool(b) => Value::Bool(*b),
        serde_json::Value::Number(n) => match n.as_i64() {
            Some(i) => Value::Int(i),
            None => Value::Float(n.as_f64().unwrap_or_default()),
        },
        serde_json::Value::String(s) => Value::Str(s.as_str().into()),
        serde_json::Value::Array(items) => {
            let items: Vec<Value> = items.iter().map(json_to_value).collect();
            Value::Array(Array::from(items.as_slice()))
        }
        serde_json::Value::Object(map) => {
            let mut dict = Dict::new();
            for (key, value) in map {
                dict.insert(key.as_str().into(), json_to_value(value));
            }
            Value::Dict(dict)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_json_to_value_nests() {
        let value = json_to_value(&json!({"title": "Ash", "pages": 3, "cover": null, "tags": ["a", "b"]}));
        let Value::Dict(dict) = value else {
            panic!("expected a dict");
        };
        assert_eq!(dict.len(), 4);
        assert!(dict.contains("tags"));
        assert_eq!(dict.at("pages".into(), None).unwrap(), Value::Int(3));
        assert_eq!(dict.at("cover".into(), None).unwrap(), Value::None);
    }

    #[test]
    fn test_world_serves_main_and_cover_only() {
        let world = BookWorld::new("Hello", Dict::new(), "/cover.png", Some(vec![1, 2, 3]));
        assert!(world.source(world.main()).is_ok());
        assert!(world.file(FileId::new(None, VirtualPath::new("/cover.png"))).is_ok());
        assert!(world.file(FileId::new(None, VirtualPath::new("/other.png"))).is_err());

        let bare = BookWorld::new("Hello", Dict::new(), "/cover.png", None);
        assert!(bare.file(FileId::new(None, VirtualPath::new("/cover.png"))).is_err());
        assert!(bare.today(None).is_some());
    }

    #[test]
    fn test_embedded_fonts_are_available() {
        assert!(!font_cache().fonts.is_empty());
    }
}
