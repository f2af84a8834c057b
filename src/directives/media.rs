//! Embedded media: hosted video players and HTML5 `<video>` / `<audio>`.

use std::path::Path;

use super::{attr, ContentRule, Directive, DirectiveContext, DirectiveHandler, Node, OptionKind};
use crate::error::DirectiveError;

const EMBED_OPTIONS: &[(&str, OptionKind)] = &[
    ("width", OptionKind::Length),
    ("height", OptionKind::Length),
    ("align", OptionKind::Align),
];

/// Player iframe for a hosted video service.
pub struct EmbedDirective {
    name: &'static str,
    url_prefix: &'static str,
    default_width: &'static str,
    default_height: &'static str,
}

impl EmbedDirective {
    pub fn youtube() -> Self {
        Self {
            name: "youtube",
            url_prefix: "https://www.youtube.com/embed/",
            default_width: "560",
            default_height: "315",
        }
    }

    pub fn vimeo() -> Self {
        Self {
            name: "vimeo",
            url_prefix: "https://player.vimeo.com/video/",
            default_width: "640",
            default_height: "360",
        }
    }
}

fn align_class(base: &str, directive: &Directive) -> String {
    match directive.get_option("align") {
        Some(align) => format!("{} align-{}", base, align),
        None => base.to_string(),
    }
}

impl DirectiveHandler for EmbedDirective {
    fn name(&self) -> &str {
        self.name
    }

    fn required_arguments(&self) -> usize {
        1
    }

    fn option_spec(&self) -> &[(&'static str, OptionKind)] {
        EMBED_OPTIONS
    }

    fn run(
        &self,
        directive: &Directive,
        _context: &mut DirectiveContext<'_>,
    ) -> Result<Vec<Node>, DirectiveError> {
        let id = &directive.arguments[0];
        if !id.chars().all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_') {
            return Err(DirectiveError::InvalidArgument {
                directive: self.name.to_string(),
                argument: id.clone(),
                reason: "video ids contain only letters, digits, '-' and '_'".to_string(),
            });
        }

        let width = directive.get_option("width").unwrap_or(self.default_width);
        let height = directive.get_option("height").unwrap_or(self.default_height);
        let iframe = format!(
            "<iframe width=\"{}\" height=\"{}\" src=\"{}{}\" frameborder=\"0\" \
             allow=\"autoplay; encrypted-media; picture-in-picture\" allowfullscreen></iframe>",
            attr(width),
            attr(height),
            self.url_prefix,
            id
        );
        Ok(vec![Node::Container {
            classes: align_class("video-container", directive)
                .split(' ')
                .map(str::to_string)
                .collect(),
            children: vec![Node::Raw(iframe)],
        }])
    }
}

fn media_type(
    path: &str,
    table: &'static [(&'static str, &'static str)],
) -> Option<&'static str> {
    let extension = Path::new(path).extension()?.to_str()?.to_lowercase();
    table
        .iter()
        .find(|(ext, _)| *ext == extension)
        .map(|(_, mime)| *mime)
}

const VIDEO_TYPES: &[(&str, &str)] = &[
    ("mp4", "video/mp4"),
    ("m4v", "video/mp4"),
    ("webm", "video/webm"),
    ("ogv", "video/ogg"),
    ("ogg", "video/ogg"),
    ("mov", "video/quicktime"),
];

const AUDIO_TYPES: &[(&str, &str)] = &[
    ("mp3", "audio/mpeg"),
    ("ogg", "audio/ogg"),
    ("oga", "audio/ogg"),
    ("wav", "audio/wav"),
    ("flac", "audio/flac"),
    ("m4a", "audio/mp4"),
];

fn source_element(path: &str, table: &'static [(&'static str, &'static str)]) -> String {
    match media_type(path, table) {
        Some(mime) => format!("<source src=\"{}\" type=\"{}\">", attr(path), mime),
        None => format!("<source src=\"{}\">", attr(path)),
    }
}

/// `<video>` element for a local or remote file.
pub struct VideoDirective;

impl DirectiveHandler for VideoDirective {
    fn name(&self) -> &str {
        "video"
    }

    fn required_arguments(&self) -> usize {
        1
    }

    fn option_spec(&self) -> &[(&'static str, OptionKind)] {
        &[
            ("width", OptionKind::Length),
            ("height", OptionKind::Length),
            ("align", OptionKind::Align),
            ("autoplay", OptionKind::Flag),
            ("loop", OptionKind::Flag),
            ("muted", OptionKind::Flag),
            ("nocontrols", OptionKind::Flag),
            ("poster", OptionKind::Uri),
        ]
    }

    fn run(
        &self,
        directive: &Directive,
        _context: &mut DirectiveContext<'_>,
    ) -> Result<Vec<Node>, DirectiveError> {
        let path = &directive.arguments[0];
        let mut tag = format!("<video class=\"{}\"", align_class("video", directive));
        for dimension in ["width", "height"] {
            if let Some(value) = directive.get_option(dimension) {
                tag.push_str(&format!(" {}=\"{}\"", dimension, attr(value)));
            }
        }
        if !directive.has_option("nocontrols") {
            tag.push_str(" controls");
        }
        for flag in ["autoplay", "loop", "muted"] {
            if directive.has_option(flag) {
                tag.push(' ');
                tag.push_str(flag);
            }
        }
        if let Some(poster) = directive.get_option("poster") {
            tag.push_str(&format!(" poster=\"{}\"", attr(poster)));
        }
        tag.push('>');

        Ok(vec![Node::Raw(format!(
            "{}{}Your browser does not support the video tag.</video>",
            tag,
            source_element(path, VIDEO_TYPES)
        ))])
    }
}

/// `<audio>` element with playback controls.
pub struct AudioDirective;

impl DirectiveHandler for AudioDirective {
    fn name(&self) -> &str {
        "audio"
    }

    fn required_arguments(&self) -> usize {
        1
    }

    fn option_spec(&self) -> &[(&'static str, OptionKind)] {
        &[
            ("autoplay", OptionKind::Flag),
            ("loop", OptionKind::Flag),
            ("align", OptionKind::Align),
        ]
    }

    fn content(&self) -> ContentRule {
        ContentRule::Forbidden
    }

    fn run(
        &self,
        directive: &Directive,
        _context: &mut DirectiveContext<'_>,
    ) -> Result<Vec<Node>, DirectiveError> {
        let path = &directive.arguments[0];
        let mut tag = format!("<audio class=\"{}\" controls", align_class("audio", directive));
        for flag in ["autoplay", "loop"] {
            if directive.has_option(flag) {
                tag.push(' ');
                tag.push_str(flag);
            }
        }
        tag.push('>');
        Ok(vec![Node::Raw(format!(
            "{}{}</audio>",
            tag,
            source_element(path, AUDIO_TYPES)
        ))])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::directives::DirectiveRegistry;
    use crate::highlight::Highlighter;

    fn render(directive: Directive) -> Result<String, DirectiveError> {
        let registry = DirectiveRegistry::with_builtin_handlers();
        let highlighter = Highlighter::new();
        let mut context = DirectiveContext::new(&highlighter, "none", "index");
        registry
            .run(&directive, &mut context)
            .unwrap()
            .map(|nodes| nodes.iter().map(Node::to_html).collect::<Vec<_>>().join("\n"))
    }

    #[test]
    fn test_youtube_defaults() {
        let html = render(Directive::new("youtube").argument("dQw4w9WgXcQ")).unwrap();
        assert_eq!(
            html,
            "<div class=\"video-container\">\n<iframe width=\"560\" height=\"315\" \
             src=\"https://www.youtube.com/embed/dQw4w9WgXcQ\" frameborder=\"0\" \
             allow=\"autoplay; encrypted-media; picture-in-picture\" allowfullscreen></iframe>\n</div>"
        );
    }

    #[test]
    fn test_vimeo_with_options() {
        let html = render(
            Directive::new("vimeo")
                .argument("76979871")
                .option("width", "100%")
                .option("align", "center"),
        )
        .unwrap();
        assert!(html.starts_with("<div class=\"video-container align-center\">"));
        assert!(html.contains("width=\"100%\" height=\"360\""));
        assert!(html.contains("src=\"https://player.vimeo.com/video/76979871\""));
    }

    #[test]
    fn test_embed_rejects_suspicious_ids() {
        let result = render(Directive::new("youtube").argument("abc\"onload"));
        assert!(matches!(result, Err(DirectiveError::InvalidArgument { .. })));
    }

    #[test]
    fn test_video_flags() {
        let html = render(
            Directive::new("video")
                .argument("media/wifi.webm")
                .option("autoplay", "")
                .option("muted", "")
                .option("nocontrols", "")
                .option("width", "640"),
        )
        .unwrap();
        assert_eq!(
            html,
            "<video class=\"video\" width=\"640\" autoplay muted>\
             <source src=\"media/wifi.webm\" type=\"video/webm\">\
             Your browser does not support the video tag.</video>"
        );
    }

    #[test]
    fn test_video_controls_and_poster() {
        let html = render(
            Directive::new("video")
                .argument("demo.mp4")
                .option("poster", "demo.png")
                .option("align", "right"),
        )
        .unwrap();
        assert!(html.starts_with("<video class=\"video align-right\" controls poster=\"demo.png\">"));
        assert!(html.contains("type=\"video/mp4\""));
    }

    #[test]
    fn test_audio() {
        let html = render(Directive::new("audio").argument("beep.ogg").option("loop", "")).unwrap();
        assert_eq!(
            html,
            "<audio class=\"audio\" controls loop><source src=\"beep.ogg\" type=\"audio/ogg\"></audio>"
        );
        assert!(render(Directive::new("audio").argument("beep.ogg").option("muted", "")).is_err());
    }

    #[test]
    fn test_unknown_extension_omits_type() {
        let html = render(Directive::new("audio").argument("sound.xyz")).unwrap();
        assert!(html.contains("<source src=\"sound.xyz\">"));
    }
}
