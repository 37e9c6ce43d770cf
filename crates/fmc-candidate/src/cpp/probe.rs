//! Probe programs
//!
//! A probe is a tiny C++ translation unit that includes the candidate
//! sources, constructs one root object, follows a chain of parameterless
//! calls and prints one marker line describing the final result.
//!
//! Raw pointers a candidate returns are never deleted here: the candidate may
//! still own them, and the process exits right after printing. Smart
//! pointers release themselves when `main`'s locals go out of scope.
//!
//! Marker grammar, one per line, last one wins:
//!
//! ```text
//! @@fmcheck@@C            root constructed, no call made
//! @@fmcheck@@T:<len>:<s>  text result of <len> bytes
//! @@fmcheck@@P:some       non-null object result
//! @@fmcheck@@P:null       null object result
//! @@fmcheck@@V            void result
//! @@fmcheck@@O            result of another shape
//! ```

use crate::runtime::InvocationError;
use fmc_contract::is_identifier;
use std::fmt::Write as _;

/// Prefix of every probe marker line
pub const MARKER: &str = "@@fmcheck@@";

/// What the last call of a probe produced
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProbeOutcome {
    /// Root constructed; chain was empty
    Constructed,
    /// Text result
    Text(String),
    /// Non-null object
    Present,
    /// Null object
    Null,
    /// Void result
    Void,
    /// Result of a shape the probe cannot print
    Opaque,
}

const HEADERS: &str = r#"#include <iostream>
#include <memory>
#include <string>
#include <string_view>
#include <type_traits>
#include <utility>
"#;

const SUPPORT: &str = r#"
namespace fmcheck_probe {

template <typename T> struct is_smart_pointer : std::false_type {};
template <typename T, typename D> struct is_smart_pointer<std::unique_ptr<T, D>> : std::true_type {};
template <typename T> struct is_smart_pointer<std::shared_ptr<T>> : std::true_type {};

inline void emit_marker(const char* body) {
    std::cout << "\n@@fmcheck@@" << body << std::endl;
}

template <typename T>
void emit(T&& value) {
    using V = std::decay_t<T>;
    if constexpr (std::is_same_v<V, const char*> || std::is_same_v<V, char*>) {
        std::string text = value ? std::string(value) : std::string();
        std::cout << "\n@@fmcheck@@T:" << text.size() << ":" << text << std::endl;
    } else if constexpr (std::is_convertible_v<V, std::string> || std::is_same_v<V, std::string_view>) {
        std::string text{std::string_view(value)};
        std::cout << "\n@@fmcheck@@T:" << text.size() << ":" << text << std::endl;
    } else if constexpr (std::is_pointer_v<V> || is_smart_pointer<V>::value) {
        emit_marker(value ? "P:some" : "P:null");
    } else {
        emit_marker("O");
    }
}

template <typename F>
void emit_call(F&& call) {
    if constexpr (std::is_void_v<decltype(call())>) {
        call();
        emit_marker("V");
    } else {
        auto result = call();
        emit(result);
    }
}

} // namespace fmcheck_probe
"#;

/// Render the probe for `root` followed by `chain`
///
/// `includes` are the candidate files to `#include`, with the candidate's own
/// `main` renamed out of the way. Every intermediate result must be a
/// non-null object; a null intermediate ends the probe with `P:null`.
pub fn render_probe(includes: &[String], root: &str, chain: &[String]) -> Result<String, InvocationError> {
    for name in std::iter::once(root).chain(chain.iter().map(String::as_str)) {
        if !is_identifier(name) {
            return Err(InvocationError::InvalidIdentifier(name.to_string()));
        }
    }
    if let Some(bad) = includes.iter().find(|i| i.is_empty() || i.contains(['"', '\n', '\r'])) {
        return Err(InvocationError::Internal(format!("cannot include '{bad}'")));
    }

    let mut out = String::from(HEADERS);
    out.push_str("\n#define main fmcheck_candidate_main\n");
    for include in includes {
        let _ = writeln!(out, "#include \"{include}\"");
    }
    out.push_str("#undef main\n");
    out.push_str(SUPPORT);
    out.push_str("\nint main() {\n");
    let _ = writeln!(out, "    {root} subject;");

    let Some((last, intermediates)) = chain.split_last() else {
        out.push_str("    fmcheck_probe::emit_marker(\"C\");\n    return 0;\n}\n");
        return Ok(out);
    };

    let mut receiver = "subject.".to_string();
    for (index, operation) in intermediates.iter().enumerate() {
        let _ = writeln!(out, "    auto step{index} = {receiver}{operation}();");
        let _ = writeln!(
            out,
            "    if (!step{index}) {{ fmcheck_probe::emit_marker(\"P:null\"); return 0; }}"
        );
        receiver = format!("step{index}->");
    }

    let _ = writeln!(
        out,
        "    fmcheck_probe::emit_call([&]() -> decltype(auto) {{ return {receiver}{last}(); }});"
    );
    out.push_str("    return 0;\n}\n");
    Ok(out)
}

/// Interpret probe stdout
pub fn parse_probe_output(stdout: &str) -> Result<ProbeOutcome, InvocationError> {
    let marker = stdout
        .rfind(MARKER)
        .map(|at| &stdout[at + MARKER.len()..])
        .ok_or_else(|| InvocationError::UnsupportedResult("probe printed no result".to_string()))?;

    if let Some(rest) = marker.strip_prefix("T:") {
        return parse_text(rest);
    }

    let token = marker.lines().next().unwrap_or("").trim_end_matches('\r');
    match token {
        "C" => Ok(ProbeOutcome::Constructed),
        "P:some" => Ok(ProbeOutcome::Present),
        "P:null" => Ok(ProbeOutcome::Null),
        "V" => Ok(ProbeOutcome::Void),
        "O" => Ok(ProbeOutcome::Opaque),
        other => Err(InvocationError::UnsupportedResult(format!(
            "unrecognized probe marker '{other}'"
        ))),
    }
}

fn parse_text(rest: &str) -> Result<ProbeOutcome, InvocationError> {
    let malformed = || InvocationError::UnsupportedResult("malformed text marker".to_string());
    let (len, body) = rest.split_once(':').ok_or_else(malformed)?;
    let len: usize = len.parse().map_err(|_| malformed())?;
    let text = body.as_bytes().get(..len).ok_or_else(malformed)?;
    String::from_utf8(text.to_vec())
        .map(ProbeOutcome::Text)
        .map_err(|_| InvocationError::UnsupportedResult("text result is not UTF-8".to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn includes(paths: &[&str]) -> Vec<String> {
        paths.iter().map(|p| (*p).to_string()).collect()
    }

    #[test]
    fn empty_chain_only_constructs() {
        let probe = render_probe(&includes(&["candidate.cpp"]), "ConcreteCreatorA", &[]).unwrap();
        assert!(probe.contains("ConcreteCreatorA subject;"));
        assert!(probe.contains("emit_marker(\"C\")"));
        assert!(probe.contains("#define main fmcheck_candidate_main\n#include \"candidate.cpp\"\n#undef main"));
    }

    #[test]
    fn chain_walks_through_intermediates() {
        let chain = vec!["FactoryMethod".to_string(), "Operation".to_string()];
        let probe = render_probe(&includes(&["candidate.cpp"]), "ConcreteCreatorA", &chain).unwrap();
        assert!(probe.contains("auto step0 = subject.FactoryMethod();"));
        assert!(probe.contains("return step0->Operation();"));
    }

    #[test]
    fn returned_pointers_are_left_to_their_owner() {
        let chain = vec!["factoryMethod".to_string(), "operation".to_string()];
        let probe = render_probe(&includes(&["candidate.cpp"]), "ConcreteCreatorA", &chain).unwrap();
        assert!(!probe.contains("delete"));
    }

    #[test]
    fn includes_every_listed_file_in_order() {
        let probe = render_probe(&includes(&["Product.hpp", "shapes/Widget.hpp"]), "Widget", &[]).unwrap();
        let product = probe.find("#include \"Product.hpp\"").unwrap();
        let widget = probe.find("#include \"shapes/Widget.hpp\"").unwrap();
        assert!(product < widget);
        assert!(widget < probe.find("#undef main").unwrap());

        let err = render_probe(&includes(&["bad\".hpp"]), "Widget", &[]).unwrap_err();
        assert!(matches!(err, InvocationError::Internal(_)));
    }

    #[test]
    fn rejects_non_identifiers() {
        let err = render_probe(&includes(&["candidate.cpp"]), "A; system(\"rm\")", &[]).unwrap_err();
        assert!(matches!(err, InvocationError::InvalidIdentifier(_)));

        let err = render_probe(&includes(&["candidate.cpp"]), "A", &["f()".to_string()]).unwrap_err();
        assert!(matches!(err, InvocationError::InvalidIdentifier(name) if name == "f()"));
    }

    #[test]
    fn parses_markers() {
        assert_eq!(parse_probe_output("@@fmcheck@@C\n").unwrap(), ProbeOutcome::Constructed);
        assert_eq!(parse_probe_output("noise\n@@fmcheck@@P:null\n").unwrap(), ProbeOutcome::Null);
        assert_eq!(parse_probe_output("@@fmcheck@@P:some\n").unwrap(), ProbeOutcome::Present);
        assert_eq!(parse_probe_output("@@fmcheck@@V\n").unwrap(), ProbeOutcome::Void);
        assert_eq!(parse_probe_output("@@fmcheck@@O\n").unwrap(), ProbeOutcome::Opaque);
    }

    #[test]
    fn text_marker_keeps_embedded_newlines() {
        let out = "log line\n@@fmcheck@@T:6:ab\ncd!\n";
        assert_eq!(parse_probe_output(out).unwrap(), ProbeOutcome::Text("ab\ncd!".to_string()));
        assert_eq!(parse_probe_output("@@fmcheck@@T:0:\n").unwrap(), ProbeOutcome::Text(String::new()));
    }

    #[test]
    fn missing_or_malformed_markers_are_unsupported() {
        assert!(matches!(
            parse_probe_output("hello"),
            Err(InvocationError::UnsupportedResult(_))
        ));
        assert!(matches!(
            parse_probe_output("@@fmcheck@@T:99:short"),
            Err(InvocationError::UnsupportedResult(_))
        ));
    }
}
