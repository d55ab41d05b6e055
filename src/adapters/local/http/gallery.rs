use super::AppState;
use crate::ports::repository::JobStore;
use axum::{extract::State, response::Html};
use std::path::Path;
use tracing::warn;

/// Finished videos in the output directory, newest names last.
fn list_outputs(dir: &Path) -> Vec<String> {
    let mut files = match std::fs::read_dir(dir) {
        Ok(entries) => entries
            .filter_map(|entry| {
                entry
                    .ok()
                    .and_then(|e| e.file_name().to_str().map(String::from))
            })
            .filter(|name| name.ends_with(".mp4"))
            .collect::<Vec<String>>(),
        Err(e) => {
            warn!("Could not read output directory {:?}: {}", dir, e);
            Vec::new()
        }
    };
    files.sort();
    files
}

fn escape(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}

pub async fn index<S>(State(state): State<AppState<S>>) -> Html<String>
where
    S: JobStore + Clone + 'static,
{
    let files = list_outputs(&state.output_dir);
    let file_list = if files.is_empty() {
        "<li>No upscaled videos yet.</li>".to_string()
    } else {
        files
            .iter()
            .map(|file| {
                let name = escape(file);
                format!(r#"<li><a href="/outputs/{0}">{0}</a></li>"#, name)
            })
            .collect::<String>()
    };

    Html(format!(
        r#"
        <!doctype html>
        <html>
            <head>
                <title>Video upscaler</title>
            </head>
            <body>
                <h1>Upscaled videos</h1>
                <ul>{}</ul>
                <form action="/upscale?scale={}" method="post" enctype="multipart/form-data">
                    <div>
                        <label>
                            Upload video:
                            <input type="file" name="file" accept="video/*">
                        </label>
                    </div>
                    <div>
                        <input type="submit" value="Upscale">
                    </div>
                </form>
            </body>
        </html>
        "#,
        file_list, state.defaults.scale_factor
    ))
}

#[cfg(test)]
mod tests {
    use super::super::router;
    use super::super::test_support::{body_text, state};
    use super::*;
    use axum::{
        body::Body,
        http::{Request, StatusCode},
    };
    use tempfile::tempdir;
    use tower::ServiceExt;

    #[test]
    fn test_list_outputs_only_mp4() {
        let dir = tempdir().unwrap();
        std::fs::write(dir.path().join("b_upscaled_2x.mp4"), b"").unwrap();
        std::fs::write(dir.path().join("a_upscaled_4x.mp4"), b"").unwrap();
        std::fs::write(dir.path().join("notes.txt"), b"").unwrap();

        assert_eq!(
            list_outputs(dir.path()),
            vec!["a_upscaled_4x.mp4", "b_upscaled_2x.mp4"]
        );
    }

    #[test]
    fn test_list_outputs_missing_dir() {
        let dir = tempdir().unwrap();
        assert!(list_outputs(&dir.path().join("gone")).is_empty());
    }

    #[tokio::test]
    async fn test_index_links_outputs() {
        let root = tempdir().unwrap();
        let state = state(&root);
        std::fs::write(state.output_dir.join("clip_upscaled_2x.mp4"), b"video").unwrap();
        let app = router(state);

        let response = app
            .clone()
            .oneshot(Request::get("/").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let html = body_text(response.into_body()).await;
        assert!(html.contains(r#"href="/outputs/clip_upscaled_2x.mp4""#));
        assert!(html.contains(r#"name="file""#));

        let response = app
            .oneshot(
                Request::get("/outputs/clip_upscaled_2x.mp4")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_text(response.into_body()).await, "video");
    }
}
