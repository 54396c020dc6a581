// src/prompts.rs
//
// Prompt composition for the text/vision provider and parsing of what it
// sends back. Everything here is pure.

use serde_json::Value;

use crate::catalog::{self, VisualPreset};

/// Upper bound accepted by the music provider for a prompt.
pub const MUSIC_PROMPT_MAX_CHARS: usize = 295;
const MUSIC_PROMPT_KEEP_CHARS: usize = 292;

/// Characters of unparsable vision output reused as the image prompt.
const RAW_PROMPT_FALLBACK_CHARS: usize = 500;

pub const DEFAULT_MUSIC_STYLE: &str = "Commercial Jingle, Latin Pop";

#[derive(Debug, Clone, Copy)]
pub struct ImageBrief<'a> {
    pub product_name: &'a str,
    pub description: Option<&'a str>,
    pub brand: Option<&'a str>,
    pub has_logo: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SocialCopy {
    pub copy: String,
    pub hashtags: Vec<String>,
}

/// Structured result of the vision call: the image prompt plus per-platform copy.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ImageDraft {
    pub image_prompt: String,
    pub facebook: SocialCopy,
    pub instagram: SocialCopy,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MusicDraft {
    pub music_prompt: String,
    pub music_style: String,
    pub mood: String,
    pub genre: String,
    pub lyrics_theme: String,
}

impl MusicDraft {
    /// Used when the text provider fails or produces no usable prompt.
    pub fn fallback() -> Self {
        Self {
            music_prompt:
                "Upbeat pop jingle, vocals in Mexican Spanish, catchy commercial tune, energetic beat"
                    .to_string(),
            music_style: "Commercial Jingle, Latin Pop, Catchy Spanish Vocals".to_string(),
            mood: "energetic".to_string(),
            genre: "pop jingle".to_string(),
            lyrics_theme: "beneficios del producto".to_string(),
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct MusicBrief<'a> {
    pub brief: &'a str,
    pub duration_secs: i32,
    pub genre: Option<&'a str>,
    pub mood: Option<&'a str>,
    pub instrumental: bool,
    pub lyrics_language: &'a str,
}

fn or_unspecified(value: Option<&str>) -> &str {
    match value.map(str::trim) {
        Some(v) if !v.is_empty() => v,
        _ => "No especificada",
    }
}

/// System prompt for the vision provider: product brief, preset parameters,
/// production rules and the JSON shape expected back.
pub fn image_system_prompt(preset: &VisualPreset, brief: &ImageBrief<'_>) -> String {
    let logo_rules = if brief.has_logo {
        "### LOGO OFICIAL (Imagen del logo proporcionada)\n\
         - INTEGRACIÓN FÍSICA OBLIGATORIA: El logo debe estar FABRICADO en la escena.\n\
         - Opciones: grabado en metal, bordado en tela, neón real, tallado en madera, impreso en material del producto.\n\
         - PROHIBIDO: Logo flotando, pegado digitalmente, o sobrepuesto como watermark."
    } else {
        "### LOGO (Crear tipográfico si hay marca)\n\
         - Diseña logotipo elegante usando el nombre de la marca.\n\
         - Debe estar físicamente integrado en un material de la escena."
    };

    format!(
        r##"
##############################################
#  SISTEMA DE GENERACIÓN VIRAL              #
##############################################

### BRIEF DEL PRODUCTO
- **Producto:** {product}
- **Descripción:** {description}
- **Marca:** {brand}

REGLA DE ORO: Jamás inventar precios, promociones o información no proporcionada.

--------------------------------------------------
### ESTILO VISUAL: {style}
--------------------------------------------------

**CÁMARA:**
{camera}

**ILUMINACIÓN:**
{lighting}

**ENTORNO/CONCEPTO:**
{environment}

**EFECTOS VISUALES:**
{vfx}

**MOOD/EMOCIÓN:**
{mood}

--------------------------------------------------
### REGLAS DE PRODUCCIÓN CINEMATOGRÁFICA
--------------------------------------------------

**1. EL PRODUCTO COMO HÉROE ABSOLUTO**
- Replica EXACTAMENTE el producto de la imagen adjunta.
- Fidelidad 100% en: colores, forma, etiquetas, proporciones.
- El producto debe verse REAL, no renderizado ni plástico.

**2. FÍSICA REAL (CON LICENCIA CREATIVA)**
- Respeta gravedad, reflejos, sombras coherentes.
- Los materiales deben comportarse como en realidad.
- La "magia" viene del CONCEPTO, no de física rota.

{logo_rules}

**4. COMPOSICIÓN PARA SCROLL-STOPPING**
- Punto focal inmediatamente claro.
- Contraste dramático figura-fondo.
- Detalle que recompense el zoom.
- Aspecto ratio: 1:1 (optimizado para Instagram/Facebook).

--------------------------------------------------
### OUTPUT REQUERIDO (JSON)
--------------------------------------------------
```json
{{
  "image_prompt": "Prompt detallado en INGLÉS para generación de imagen. Incluir: estilo visual, cámara, iluminación, ambiente. Mínimo 100 palabras.",
  "facebook": {{
    "copy": "Texto para Facebook en español mexicano (máx 280 chars). SIN mencionar el estilo visual, solo hablar del producto.",
    "hashtags": ["#relevante1", "#relevante2", "#viral"]
  }},
  "instagram": {{
    "copy": "Texto para Instagram en español mexicano (máx 150 chars). SIN mencionar el estilo visual.",
    "hashtags": ["#insta1", "#insta2", "#aesthetic"]
  }}
}}
```

IMPORTANTE PARA COPY DE REDES:
- PROHIBIDO mencionar el estilo visual en el copy
- El copy debe hablar SOLO del PRODUCTO REAL: sabor, beneficios, características
- Tono: natural, atractivo, directo. Como lo escribiría el dueño del negocio.
"##,
        product = brief.product_name,
        description = or_unspecified(brief.description),
        brand = or_unspecified(brief.brand),
        style = preset.name.to_uppercase(),
        camera = preset.camera,
        lighting = preset.lighting,
        environment = preset.environment,
        vfx = preset.vfx,
        mood = preset.mood,
    )
}

/// Final prompt for the image provider, wrapping the vision model's prompt
/// with the preset's cinematographic parameters.
pub fn final_image_prompt(preset: &VisualPreset, image_prompt: &str) -> String {
    format!(
        "
Create a professional viral product photo with these specifications:

STYLE: {name} - {mood}
CAMERA: {camera}
LIGHTING: {lighting}
ENVIRONMENT: {environment}
VFX: {vfx}

PRODUCT DETAILS:
{image_prompt}

The product shown in the reference image must be replicated EXACTLY with perfect fidelity to colors, shape, labels and proportions. Create a stunning, scroll-stopping image optimized for social media (1:1 aspect ratio).
",
        name = preset.name,
        mood = preset.mood,
        camera = preset.camera,
        lighting = preset.lighting,
        environment = preset.environment,
        vfx = preset.vfx,
    )
}

/// Extracts the outermost `{...}` block from the vision output. Output that
/// holds no parsable object degrades to the leading text as the image prompt
/// with empty copy; this never fails.
pub fn parse_image_draft(raw: &str) -> ImageDraft {
    if let (Some(start), Some(end)) = (raw.find('{'), raw.rfind('}')) {
        if start < end {
            match serde_json::from_str::<Value>(&raw[start..=end]) {
                Ok(reply) if reply.is_object() => {
                    return ImageDraft {
                        image_prompt: text_field(&reply, "image_prompt"),
                        facebook: social_copy(reply.get("facebook")),
                        instagram: social_copy(reply.get("instagram")),
                    };
                }
                Ok(_) => log::warn!("vision output is not a json object"),
                Err(e) => log::warn!("vision output is not valid json err={}", e),
            }
        }
    }

    ImageDraft {
        image_prompt: raw.chars().take(RAW_PROMPT_FALLBACK_CHARS).collect(),
        ..ImageDraft::default()
    }
}

/// String value under `key`; absent, null or non-string values read as empty.
fn text_field(reply: &Value, key: &str) -> String {
    reply
        .get(key)
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string()
}

fn social_copy(platform: Option<&Value>) -> SocialCopy {
    let Some(platform) = platform.filter(|p| p.is_object()) else {
        return SocialCopy::default();
    };
    SocialCopy {
        copy: text_field(platform, "copy"),
        hashtags: hashtags(platform.get("hashtags")),
    }
}

/// Accepts a list of tags or a single space separated string of them.
fn hashtags(value: Option<&Value>) -> Vec<String> {
    match value {
        Some(Value::Array(items)) => items
            .iter()
            .filter_map(Value::as_str)
            .map(str::trim)
            .filter(|tag| !tag.is_empty())
            .map(str::to_string)
            .collect(),
        Some(Value::String(tags)) => tags.split_whitespace().map(str::to_string).collect(),
        _ => Vec::new(),
    }
}

pub const MUSIC_SYSTEM_PROMPT: &str = r#"Eres un Director Musical experto en publicidad y jingles comerciales.
Analiza el brief y genera un prompt musical CON LETRA EN ESPAÑOL MEXICANO para MusicGPT.

REGLAS:
1. Prompt en INGLÉS (MusicGPT entiende mejor instrucciones en inglés)
2. Incluir: género, mood, tempo, instrumentos
3. CRÍTICO: Especificar "vocals singing in Mexican Spanish"
4. Las lyrics deben ser pegajosas y mencionar el producto/servicio
5. MÁXIMO 250 CARACTERES el prompt (esto es MUY IMPORTANTE, MusicGPT falla si es más largo)

OUTPUT JSON:
{
    "music_prompt": "Prompt CORTO de max 250 caracteres con 'vocals singing in Mexican Spanish'",
    "music_style": "Estilo para MusicGPT (ej: Commercial Jingle, Latin Pop)",
    "mood": "Estado de ánimo",
    "genre": "Género musical",
    "lyrics_theme": "Tema de la letra"
}"#;

/// User message for the music prompt request. A genre matching a catalog
/// music style also carries that style's prompt hint.
pub fn music_user_prompt(brief: &MusicBrief<'_>) -> String {
    let mut content = format!(
        "Brief: {}\nDuración: {}s\nPlataforma: Instagram/TikTok/YouTube",
        brief.brief, brief.duration_secs
    );

    if let Some(genre) = brief.genre.filter(|g| !g.trim().is_empty()) {
        content.push_str(&format!("\nGénero preferido: {genre}"));
        if let Some(style) = catalog::music_style(genre) {
            content.push_str(&format!("\nEstilo sugerido: {}", style.prompt_hint));
        }
    }
    if let Some(mood) = brief.mood.filter(|m| !m.trim().is_empty()) {
        content.push_str(&format!("\nMood preferido: {mood}"));
    }
    if brief.instrumental {
        content.push_str("\nNOTA: Debe ser INSTRUMENTAL, sin voces.");
    } else {
        content.push_str(&format!("\nIdioma de la letra: {}", brief.lyrics_language));
    }
    content
}

/// Parses the provider's JSON answer. `None` when nothing usable came back.
pub fn parse_music_draft(raw: &str) -> Option<MusicDraft> {
    let reply: Value = match serde_json::from_str(raw.trim()) {
        Ok(reply) => reply,
        Err(e) => {
            log::warn!("music prompt output is not valid json err={}", e);
            return None;
        }
    };
    if !reply.is_object() {
        log::warn!("music prompt output is not a json object");
        return None;
    }

    let music_prompt = text_field(&reply, "music_prompt");
    if music_prompt.trim().is_empty() {
        return None;
    }
    let mut music_style = text_field(&reply, "music_style");
    if music_style.trim().is_empty() {
        music_style = DEFAULT_MUSIC_STYLE.to_string();
    }
    Some(MusicDraft {
        music_prompt: clamp_music_prompt(&music_prompt),
        music_style,
        mood: text_field(&reply, "mood"),
        genre: text_field(&reply, "genre"),
        lyrics_theme: text_field(&reply, "lyrics_theme"),
    })
}

/// Cuts prompts longer than [`MUSIC_PROMPT_MAX_CHARS`] and marks the cut with `...`.
pub fn clamp_music_prompt(prompt: &str) -> String {
    if prompt.chars().count() <= MUSIC_PROMPT_MAX_CHARS {
        return prompt.to_string();
    }
    let mut cut: String = prompt.chars().take(MUSIC_PROMPT_KEEP_CHARS).collect();
    cut.push_str("...");
    cut
}
