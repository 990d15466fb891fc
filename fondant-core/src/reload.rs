/// Add the live-reload client before `</body>`, or at the end when the page
/// has no body tag.
pub fn inject_livereload_script(html: &str, ws_url: &str) -> String {
    let script = format!(
        r#"
<script>
(function() {{
    var socket = new WebSocket('{ws_url}');
    socket.onmessage = function(event) {{
        if (event.data === 'reload') {{
            location.reload();
        }}
    }};
    socket.onclose = function() {{
        console.log('Live reload disconnected');
    }};
}})();
</script>
"#
    );

    match html.rfind("</body>") {
        Some(pos) => {
            let mut result = String::with_capacity(html.len() + script.len());
            result.push_str(&html[..pos]);
            result.push_str(&script);
            result.push_str(&html[pos..]);
            result
        }
        None => format!("{html}{script}"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_script_lands_before_closing_body() {
        let html = inject_livereload_script(
            "<html><body><p>x</p></body></html>",
            "ws://127.0.0.1:3000/__livereload",
        );
        let script = html.find("ws://127.0.0.1:3000/__livereload").unwrap();
        assert!(script < html.find("</body>").unwrap());
        assert!(html.ends_with("</body></html>"));
    }

    #[test]
    fn test_fragment_without_body_gets_script_appended() {
        let html = inject_livereload_script("<p>x</p>", "ws://h/r");
        assert!(html.starts_with("<p>x</p>"));
        assert!(html.contains("ws://h/r"));
    }
}
