//! Script printing via `swc_ecma_codegen`.

use std::io;
use swc_common::{sync::Lrc, SourceMap};
use swc_ecma_ast::{EsVersion, Script};
use swc_ecma_codegen::{text_writer::JsWriter, Config, Emitter};

/// Print a script that has no source map of its own (e.g. one built in code).
pub fn print_script(script: &Script) -> io::Result<String> {
    print_script_with(script, Default::default())
}

/// Print a script using the source map it was parsed with.
pub fn print_script_with(script: &Script, source_map: Lrc<SourceMap>) -> io::Result<String> {
    let mut buf = Vec::new();
    {
        let mut emitter = Emitter {
            cfg: Config::default().with_target(EsVersion::latest()),
            cm: source_map.clone(),
            comments: None,
            wr: JsWriter::new(source_map, "\n", &mut buf, None),
        };
        emitter.emit_script(script)?;
    }

    String::from_utf8(buf).map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parse_script_with_cache;
    use bindpath_diagnostics::SourceCache;

    fn compact(code: &str) -> String {
        code.chars().filter(|c| !c.is_whitespace()).collect()
    }

    #[test]
    fn test_print_round_trip_keeps_parens_and_raw_literals() {
        let mut cache = SourceCache::new();
        let parsed = parse_script_with_cache(
            "global.inject = function () { (item['key'], item[0]) }",
            "t.js",
            &mut cache,
        )
        .unwrap();

        let code = parsed.print().unwrap();
        assert_eq!(
            compact(&code),
            "global.inject=function(){(item['key'],item[0]);};"
        );
    }

    #[test]
    fn test_print_without_source_map() {
        let mut cache = SourceCache::new();
        let parsed = parse_script_with_cache("a.b;", "t.js", &mut cache).unwrap();
        assert_eq!(print_script(&parsed.script).unwrap().trim(), "a.b;");
    }
}
