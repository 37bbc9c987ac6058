//! Pull the shipment status text out of a carrier tracking page.
//!
//! Locations are tried in order:
//! 1. the paragraph right after an `<h2>` mentioning "envío"
//! 2. an element whose class mentions "estado"
//! 3. a `<p>` whose class mentions "status"
//! 4. any text node containing a known carrier phrase (phrase order wins)
//!
//! Script and style blocks are removed first so inline JSON never matches.

use regex::Regex;

/// Carrier phrases that identify a status node when no structural match exists.
pub const STATUS_PHRASES: [&str; 8] = [
    "entregado",
    "transito",
    "tránsito",
    "devuelto",
    "ENVÍO PENDIENTE POR ADMITIR",
    "Viajando a tu destino",
    "Recibimos",
    "En Centro Logístico Origen",
];

pub struct StatusExtractor {
    noise: Regex,
    heading_then_paragraph: Regex,
    estado_class: Regex,
    status_paragraph: Regex,
    tag: Regex,
    entity: Regex,
}

impl StatusExtractor {
    pub fn new() -> Result<Self, regex::Error> {
        Ok(Self {
            noise: Regex::new(r"(?is)<script\b[^>]*>.*?</script>|<style\b[^>]*>.*?</style>|<!--.*?-->")?,
            heading_then_paragraph: Regex::new(r"(?is)<h2\b[^>]*>(.*?)</h2>\s*<p\b[^>]*>(.*?)</p>")?,
            estado_class: Regex::new(
                r#"(?is)<(div|span|p)\b[^>]*\bclass\s*=\s*["'][^"']*estado[^"']*["'][^>]*>(.*?)</(?:div|span|p)>"#,
            )?,
            status_paragraph: Regex::new(
                r#"(?is)<p\b[^>]*\bclass\s*=\s*["'][^"']*status[^"']*["'][^>]*>(.*?)</p>"#,
            )?,
            tag: Regex::new(r"(?s)<[^>]*>")?,
            entity: Regex::new(r"&(#[0-9]+|#[xX][0-9a-fA-F]+|[a-zA-Z]+);")?,
        })
    }

    /// Status text found in `html`, or `None` when the page carries none.
    pub fn extract(&self, html: &str) -> Option<String> {
        let html = self.noise.replace_all(html, " ");

        let found = self
            .after_envio_heading(&html)
            .or_else(|| self.first_non_empty(&self.estado_class, &html, 2))
            .or_else(|| self.first_non_empty(&self.status_paragraph, &html, 1))
            .or_else(|| self.phrase_node(&html));

        found.filter(|s| !s.is_empty())
    }

    fn after_envio_heading(&self, html: &str) -> Option<String> {
        self.heading_then_paragraph.captures_iter(html).find_map(|caps| {
            let heading = self.text_of(&caps[1]).to_lowercase();
            if heading.contains("envío") || heading.contains("envio") {
                Some(self.text_of(&caps[2])).filter(|t| !t.is_empty())
            } else {
                None
            }
        })
    }

    fn first_non_empty(&self, re: &Regex, html: &str, group: usize) -> Option<String> {
        re.captures_iter(html)
            .filter_map(|caps| caps.get(group).map(|m| self.text_of(m.as_str())))
            .find(|t| !t.is_empty())
    }

    fn phrase_node(&self, html: &str) -> Option<String> {
        let nodes: Vec<String> = self
            .tag
            .split(html)
            .map(|chunk| self.text_of(chunk))
            .filter(|t| !t.is_empty())
            .collect();

        STATUS_PHRASES.iter().find_map(|phrase| {
            let phrase = phrase.to_lowercase();
            nodes.iter().find(|n| n.to_lowercase().contains(&phrase)).cloned()
        })
    }

    /// Visible text of an HTML fragment: tags dropped, entities decoded,
    /// whitespace collapsed.
    fn text_of(&self, fragment: &str) -> String {
        let stripped = self.tag.replace_all(fragment, " ");
        let decoded = self.entity.replace_all(&stripped, |caps: &regex::Captures| {
            decode_entity(&caps[1]).unwrap_or_else(|| caps[0].to_string())
        });
        decoded.split_whitespace().collect::<Vec<_>>().join(" ")
    }
}

fn decode_entity(name: &str) -> Option<String> {
    if let Some(num) = name.strip_prefix('#') {
        let code = match num.strip_prefix(['x', 'X']) {
            Some(hex) => u32::from_str_radix(hex, 16).ok()?,
            None => num.parse().ok()?,
        };
        return char::from_u32(code).map(String::from);
    }
    let c = match name {
        "nbsp" => ' ',
        "amp" => '&',
        "lt" => '<',
        "gt" => '>',
        "quot" => '"',
        "apos" => '\'',
        "aacute" => 'á',
        "eacute" => 'é',
        "iacute" => 'í',
        "oacute" => 'ó',
        "uacute" => 'ú',
        "ntilde" => 'ñ',
        "Aacute" => 'Á',
        "Eacute" => 'É',
        "Iacute" => 'Í',
        "Oacute" => 'Ó',
        "Uacute" => 'Ú',
        "Ntilde" => 'Ñ',
        _ => return None,
    };
    Some(c.to_string())
}
