//! Parsed-script memoization. The script parser itself is an external
//! collaborator injected as a callback; this cache guarantees it runs at
//! most once per resref.

use std::collections::HashMap;
use std::rc::Rc;

use aurora_core::resref::{Resource, ResourceType, Resref};

use crate::resources::ResourceManager;

/// Opaque result of the external script parser.
#[derive(Debug, Clone, PartialEq)]
pub struct ParsedScript {
    pub name: String,
    pub source: String,
}

pub type ScriptParserFn = Box<dyn Fn(&str, &[u8]) -> Option<ParsedScript>>;

pub struct ParsedScriptCache {
    parser: ScriptParserFn,
    cache: HashMap<Resref, Option<Rc<ParsedScript>>>,
}

impl Default for ParsedScriptCache {
    fn default() -> Self {
        ParsedScriptCache::new()
    }
}

impl ParsedScriptCache {
    pub fn new() -> ParsedScriptCache {
        ParsedScriptCache::with_parser(Box::new(|name, bytes| {
            Some(ParsedScript {
                name: name.to_string(),
                source: String::from_utf8_lossy(bytes).into_owned(),
            })
        }))
    }

    pub fn with_parser(parser: ScriptParserFn) -> ParsedScriptCache {
        ParsedScriptCache {
            parser,
            cache: HashMap::new(),
        }
    }

    /// The parsed form of `name.nss`; the collaborator is invoked once.
    pub fn get(&mut self, resman: &ResourceManager, name: &str) -> Option<Rc<ParsedScript>> {
        let key = Resref::from(name);
        if let Some(cached) = self.cache.get(&key) {
            return cached.clone();
        }

        let data = resman.demand(&Resource::new(key, ResourceType::Nss));
        let parsed = if data.is_empty() {
            None
        } else {
            (self.parser)(name, &data.bytes).map(Rc::new)
        };
        self.cache.insert(key, parsed.clone());
        parsed
    }

    pub fn clear(&mut self) {
        self.cache.clear();
    }
}
