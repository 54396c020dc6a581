// src/catalog.rs
//
// Read-only preset registry: visual styles, business categories, music
// styles and credit packages. Everything here is `static` and shared by all
// requests.

#[derive(Debug, Clone, Copy)]
pub struct Category {
    pub id: &'static str,
    pub name: &'static str,
    pub icon: &'static str,
    pub description: &'static str,
}

/// Visual preset with the cinematographic parameters fed into prompts.
#[derive(Debug, Clone, Copy)]
pub struct VisualPreset {
    pub id: &'static str,
    pub name: &'static str,
    pub description: &'static str,
    pub icon: &'static str,
    pub preview_color: &'static str,
    pub example_image: &'static str,
    pub categories: &'static [&'static str],
    pub camera: &'static str,
    pub lighting: &'static str,
    pub environment: &'static str,
    pub vfx: &'static str,
    pub color_grade: &'static str,
    pub composition: &'static str,
    pub mood: &'static str,
    pub viral_hook: &'static str,
}

#[derive(Debug, Clone, Copy)]
pub struct MusicStyle {
    pub id: &'static str,
    pub name: &'static str,
    pub description: &'static str,
    pub icon: &'static str,
    pub prompt_hint: &'static str,
}

#[derive(Debug, Clone, Copy)]
pub struct CreditPackage {
    pub id: &'static str,
    pub credits: i32,
    /// Price in the canonical currency (MXN), in centavos.
    pub price_mxn_cents: i64,
    pub name: &'static str,
    pub description: &'static str,
    pub popular: bool,
    pub best_value: bool,
}

/// Category id that matches every preset.
pub const ALL_CATEGORIES: &str = "todos";

pub static CATEGORIES: &[Category] = &[
    Category {
        id: "comida",
        name: "Comida y Bebidas",
        icon: "🍕",
        description: "Restaurantes, panaderías, cafeterías, productos alimenticios",
    },
    Category {
        id: "moda",
        name: "Moda y Accesorios",
        icon: "👗",
        description: "Ropa, zapatos, bolsas, joyería, accesorios",
    },
    Category {
        id: "tecnologia",
        name: "Tecnología y Gadgets",
        icon: "📱",
        description: "Electrónicos, gadgets, software, apps",
    },
    Category {
        id: "belleza",
        name: "Belleza y Cosmética",
        icon: "💄",
        description: "Maquillaje, skincare, productos de belleza",
    },
    Category {
        id: "hogar",
        name: "Hogar y Decoración",
        icon: "🏠",
        description: "Muebles, decoración, artículos para el hogar",
    },
    Category {
        id: "todos",
        name: "Ver Todos",
        icon: "✨",
        description: "Todos los estilos disponibles",
    },
];

pub static VISUAL_PRESETS: &[VisualPreset] = &[
    VisualPreset {
        id: "macro_explosion",
        name: "Explosión Macro",
        description: "Fotografía macro extrema donde el producto explota mostrando sus componentes",
        icon: "💥",
        preview_color: "#FF6B35",
        example_image: "https://images.unsplash.com/photo-1558618666-fcd25c85cd64?w=400&h=400&fit=crop",
        categories: &["comida", "tecnologia", "belleza"],
        camera: "Laowa 100mm f/2.8 2X Ultra Macro APO lens, shot at f/5.6 for focus stacking, 8K RED V-RAPTOR sensor, 1/2000s freeze frame, probe lens perspective for impossible angles",
        lighting: "4-point lighting rig: Key light (ARRI SkyPanel S60-C at 5600K, 45° camera left), 2x Aputure 600d as rim lights creating dramatic product halo (backlit at 135° and 225°), fill bounce card at 2:1 ratio, dedicated macro ring light for shadow fill on details",
        environment: "El producto EXPLOTA en sus componentes/ingredientes suspendidos en el aire como big bang culinario. Captured in controlled studio with phantom high-speed reference. Black gradient seamless backdrop transitioning to warm amber. Each particle individually lit.",
        vfx: "Practical effects with compressed air bursts, real ingredient particles captured at 10,000fps, atomized liquid droplets, fine powder suspended with precise air cannons, subtle lens dust particles, volumetric light rays through particles",
        color_grade: "Kodak Vision3 500T film emulation, pushed 1 stop. Warm shadows, vibrant product colors. Contrast ratio 6:1. Subtle orange/teal split toning in shadows/highlights",
        composition: "Center-weighted with rule of thirds breakout particles. Leading lines from explosion toward product center. Negative space intentionally asymmetric for dynamic tension. 1:1 aspect optimized for social",
        mood: "Épico, científico, descubrimiento",
        viral_hook: "Revela la 'anatomía secreta' del producto",
    },
    VisualPreset {
        id: "liquid_metal",
        name: "Metal Líquido",
        description: "Estética futurista con superficies cromadas y reflejos metálicos",
        icon: "🪞",
        preview_color: "#C0C0C0",
        example_image: "https://images.unsplash.com/photo-1635322966219-b75ed372eb01?w=400&h=400&fit=crop",
        categories: &["tecnologia", "moda", "belleza"],
        camera: "Cooke Anamorphic 50mm T2.3 SF (Special Flare) lens, 2.39:1 desqueezed to 1:1 crop. Alexa Mini LF large format sensor for shallow DOF and characteristic oval bokeh. Focus pull on product emergence.",
        lighting: "Single ARRI M40 HMI with mirror ball reflection setup creating mercury-like specular highlights. 12x12 ultrabounce for soft ambient fill at 8:1 ratio. Dedicated practical chrome sphere reference for reflection mapping. Underwater-style caustics projected on background.",
        environment: "El producto emerge de un charco de metal líquido cromado (practical galinstan or CG mercury simulation) que refleja un cielo dramático con storm clouds. Reflective floor creates infinite mirror effect. Chrome environment dome for 360° reflections.",
        vfx: "Practical chrome/mercury liquid effects combined with fluid simulation. Dripping metal strands, impossible physics reflections showing product from multiple angles simultaneously, rippling surface distortion, lens chromatic aberration on bright reflections",
        color_grade: "Blade Runner 2049 inspired. Roger Deakins' sodium vapor palette. Desaturated environment with product colors popping. Highlight rolloff to creamy whites. Shadow detail crushed to pure black. Heavy atmosphere haze.",
        composition: "Golden spiral composition with product at fibonacci focal point. Reflection creates visual dialogue. Anamorphic horizontal lens flares as leading lines toward product. Dutch angle 7° for subtle unease.",
        mood: "Futurista, premium, tecnológico",
        viral_hook: "Aesthetic satisfactorio de texturas líquidas",
    },
    VisualPreset {
        id: "neon_noir",
        name: "Neon Noir Cyberpunk",
        description: "Atmósfera urbana nocturna con luces neón y lluvia",
        icon: "🌃",
        preview_color: "#FF00FF",
        example_image: "https://images.unsplash.com/photo-1579546929518-9e396f3cc809?w=400&h=400&fit=crop",
        categories: &["tecnologia", "moda"],
        camera: "Zeiss Supreme Prime 35mm T1.5, Dutch angle 12°, shot wide open for maximum bokeh and glow bleed. Sony Venice 2 sensor with dual ISO for extreme low-light latitude. Slight camera movement suggests handheld energy.",
        lighting: "Zero traditional key light - only practicals. Primary: Quasar Science Rainbow 2 tubes (magenta R: 255, G: 0, B: 180) and (cyan R: 0, G: 255, B: 255) as competing sources at 90° angles. Secondary: Astera Titan tubes for background accent. Negative fill opposite key for deep shadows (10:1 ratio). Atmospheric haze from MDG hazer.",
        environment: "Bar/lounge cyberpunk futurista con el producto exhibido elegantemente. Reflective wet surfaces (glycerin on black plexi). Background bokeh of distant city lights. Kanji signage glow. Steam vents. Holographic displays as out-of-focus elements.",
        vfx: "Practical rain machine with backlit droplets, animated neon flicker (12% variation), lens moisture droplets, steam wisps from practical steamers, subtle chromatic aberration on neon sources, visible light rays through haze",
        color_grade: "Wong Kar-wai meets Blade Runner. Crushed blacks with magenta/cyan split. Halation bloom on neon sources. FilmConvert Nitrate with Kodak 5219 stock. Pushed 2 stops in post. Heavy grain (ISO 3200 simulation). Cross-processed look in midtones.",
        composition: "Off-center product placement using negative space. Depth layers: foreground bokeh elements, product focus plane, background neon blur. Converging perspective lines from architecture. Frame within frame using doorways/windows.",
        mood: "Misterioso, urbano, cinematográfico",
        viral_hook: "Estética cyberpunk ultra-trendy",
    },
    VisualPreset {
        id: "botanical_luxury",
        name: "Jardín Surrealista",
        description: "Naturaleza exuberante y flores exóticas en un entorno de lujo orgánico",
        icon: "🌺",
        preview_color: "#228B22",
        example_image: "https://images.unsplash.com/photo-1490750967868-88aa4486c946?w=400&h=400&fit=crop",
        categories: &["comida", "belleza", "hogar"],
        camera: "Canon CN-E 85mm T1.3 L F Cinema Prime, shot at T2 for creamy separation. 45° overhead angle on slider for subtle movement. RED Komodo 6K for organic skin-tone science. Macro diopter for foreground floral blur.",
        lighting: "Simulated golden hour: ARRI SkyPanel S360-C through 12x12 Light Grid Cloth at 3200K with CTO gel. Practical sunbeams through plant leaves using Dedolight projector with custom gobo. Background 1 stop underexposed. Reflector bounce for gentle fill at 3:1 ratio.",
        environment: "El producto crece orgánicamente de plantas exóticas, flores imposibles, naturaleza fantástica. Practical botanical set with real exotic plants (orchids, monstera, birds of paradise). Morning dew from glycerin/water mix. Moss ground cover. Visible roots breaking through soil.",
        vfx: "Practical falling petals on monofilament, misting for atmosphere, water droplets from fine spray nozzle, subtle flower movement from hidden fan, dust motes in light beams (practical fuller's earth), occasional butterfly or bee element",
        color_grade: "Terrence Malick's nature photography meets Gucci campaign. Lifted shadows with green bias. Highlight protection for skin/flower detail. Split tone: shadows olive, highlights peachy. Kodak Portra 400 emulation. Subtle vignette drawing eye to center.",
        composition: "Overhead 45° angle with product at optical center. Botanical elements frame product in circular wreath pattern. Layered depth: macro foreground flowers, sharp product, soft background foliage. Organic asymmetry following Fibonacci spiral.",
        mood: "Orgánico, lujoso, sostenible",
        viral_hook: "Conexión naturaleza-producto para audiencias eco-conscious",
    },
    VisualPreset {
        id: "zero_gravity",
        name: "Gravedad Cero",
        description: "Todo flota en un ambiente espacial de microgravedad",
        icon: "🚀",
        preview_color: "#1E90FF",
        example_image: "https://images.unsplash.com/photo-1446776811953-b23d57bd21aa?w=400&h=400&fit=crop",
        categories: &["tecnologia", "comida", "belleza"],
        camera: "Zeiss Master Prime 24mm T1.4 for heroic wide perspective. Low angle (15° up) shooting toward floating elements. ARRI Alexa 65 for maximum detail in floating particles. High frame rate 120fps for potential slow-motion elements.",
        lighting: "Wraparound soft key from ARRI SkyPanel S120-C (simulating space station interior panels) at 6500K daylight. Hard backlight through window cutout simulating direct sunlight (Mole-Richardson 20K fresnel at 5600K). Blue rim light (RGB tube) for zero-G atmosphere. Ratio: Key 4:1 to fill, backlight 2 stops over key.",
        environment: "Interior de nave espacial con el producto y sus elementos flotando en microgravedad. Practical wire rig with invisible monofilament. White/grey spacecraft panels with subtle blue accent lights. Circular window showing Earth curve. Control panels with practical LEDs. Floating cables and small objects.",
        vfx: "Wire removal for suspension rigs, perfectly spherical liquid bubbles (practical glycerin orbs), floating fabric/hair simulation, lens dust particles, subtle star field through windows, interactive reflections on helmet visor, caustic light patterns from liquid spheres",
        color_grade: "Gravity (2013) / Interstellar reference. Clean whites for spacecraft interior. Earth-blue bounce light. High contrast for space exterior shots. Desaturated shadows, saturated Earth tones. ACES workflow with careful highlight rolloff for window blowout.",
        composition: "Low angle heroic framing. Product at golden ratio intersection. Floating elements create circular movement around product. Depth: foreground floating particles, product mid-ground, spacecraft/window background. Diagonal tension lines from floating cables.",
        mood: "Innovador, aventurero, único",
        viral_hook: "Física imposible = scroll-stopping",
    },
    VisualPreset {
        id: "miniature_world",
        name: "Mundo Miniatura",
        description: "Perspectiva de diorama donde el producto es gigante",
        icon: "🏙️",
        preview_color: "#FFD700",
        example_image: "https://images.unsplash.com/photo-1558618666-fcd25c85cd64?w=400&h=400&fit=crop",
        categories: &["comida", "tecnologia", "moda", "belleza", "hogar"],
        camera: "Canon TS-E 90mm f/2.8L Macro Tilt-Shift for selective focus plane. Extreme aperture f/16-22 for forced miniature depth. Overhead crane perspective 60° down. Hasselblad X2D 100MP for extreme detail in miniature elements.",
        lighting: "Simulated overcast day: 20x20 silk overhead with ARRI M90 through 1/2 grid cloth at 5600K. Soft wrap-around suggesting outdoor ambient. Small LED practicals for miniature building windows. No harsh shadows to maintain scale illusion. Ratio 2:1 soft.",
        environment: "El producto es GIGANTE en una ciudad miniatura donde personas diminutas interactúan con él. Highly detailed architectural model (1:87 HO scale) with real miniature cars, trees, and people. Forced perspective streets leading to product. Tiny workers, cranes, and construction equipment interacting with product.",
        vfx: "Tilt-shift blur gradient emphasizing miniature scale, practical smoke from tiny chimneys, miniature traffic movement, tiny LED headlights, scale-accurate shadows, dust/atmosphere for aerial perspective, occasional tiny human interaction elements",
        color_grade: "Wes Anderson meets Miyazaki. Pastel color palette with saturated accents. Lifted blacks for storybook feel. Consistent neutral whites. Cross-processed yellows in highlights. Subtle clarity boost for hyper-detail in miniatures. Light nostalgic grain.",
        composition: "Overhead 60° angle emphasizing scale difference. Product as impossible skyscraper. Rule of thirds with miniature city filling frame. Leading lines from roads/rivers toward product. Tiny vehicles and people for scale reference. Frame balanced with architectural elements.",
        mood: "Fantástico, memorable, storytelling",
        viral_hook: "Perspectiva inesperada genera engagement",
    },
    VisualPreset {
        id: "frozen_time",
        name: "Tiempo Congelado",
        description: "Captura el momento exacto de una acción congelada en el tiempo",
        icon: "⏱️",
        preview_color: "#00CED1",
        example_image: "https://images.unsplash.com/photo-1509773896068-7fd415d91e2e?w=400&h=400&fit=crop",
        categories: &["comida", "belleza", "tecnologia"],
        camera: "Canon 200mm f/2L IS lens for telephoto compression and isolation. 1/8000s shutter equivalent freeze. Phantom Flex4K high-speed reference at 3000fps. Multi-camera array for Matrix-style bullet-time (12 cameras at 15° intervals). Medium format Phase One for hero still.",
        lighting: "Broncolor Scoro 3200 S flash system at 1/10000s t.1 duration for absolute freeze. 3-light setup: Key Para 222 at 45°, fill white v-flat at 4:1 ratio, backlight Strip at 180° creating liquid edge definition. Background lit separately 1 stop under.",
        environment: "Momento exacto de acción CONGELADO: splash, impacto, derrame, caída. Black or gradient background isolating action. Perfect liquid crown formation. Suspended droplets with internal refraction. Impact ripples at peak formation. Zero motion blur, impossible sharpness.",
        vfx: "Practical high-speed liquid capture, perfectly spherical droplets, visible shockwave displacement rings, splash corona formations, selective motion blur only on fastest elements, subtle time-slice ghosting effect, liquid tensile strings",
        color_grade: "High contrast commercial look. Pure whites, deep blacks (20:1 ratio). Vibrant saturated product colors. Clean color science. Hyper-real clarity and sharpening on frozen elements. Subtle complementary color in shadows. No grain - clinical precision.",
        composition: "Telephoto compression stacking liquid elements. Product dead-center with action radiating outward. Golden ratio placement of largest droplets. Symmetry broken by dynamic splash direction. Negative space for impact emphasis. Action frozen at mathematical peak.",
        mood: "Dinámico, energético, impactante",
        viral_hook: "Satisfacción visual de física capturada",
    },
    VisualPreset {
        id: "dark_luxury",
        name: "Lujo Oscuro",
        description: "Elegancia minimalista sobre fondo negro con acentos dorados",
        icon: "✨",
        preview_color: "#1a1a1a",
        example_image: "https://images.unsplash.com/photo-1441986300917-64674bd600d8?w=400&h=400&fit=crop",
        categories: &["moda", "belleza", "tecnologia", "comida"],
        camera: "Zeiss Otus 85mm f/1.4 for clinical sharpness with smooth rolloff. Shot at f/2.8 for razor DOF. Perfectly straight-on symmetrical framing. Phase One IQ4 150MP for luxury detail reproduction. Precise product placement on measured grid.",
        lighting: "Single dramatic spotlight: ARRI Orbiter with 30° lens grid from directly above (0° azimuth) at 3200K tungsten for warmth. Rest of scene in pure black (negative fill 360°). Light ratio infinite (unmeasurable - spotlight to void). Subtle golden bounce card for shadow side kiss at 32:1 ratio.",
        environment: "Fondo negro absoluto, el producto flota en terciopelo de oscuridad con acentos dorados. Black velvet sweep absorbing all light. Product on invisible black glass for subtle reflection. No visible ground plane. Floating gold leaf particles. Minimal gold accent elements (frame, line, geometric shape).",
        vfx: "Practical gold leaf particles suspended in air, subtle elegant smoke wisps (black smoke on black = texture only), calculated specular highlights on product, invisible support rig, floating gold geometric elements, subtle lens breathing movement",
        color_grade: "Chanel No. 5 commercial meets Tom Ford. Pure black crushing to #000000. Tungsten warmth on product (3200K bias). Gold accents at precise hex #D4AF37. Minimal highlight roll-off maintaining texture in whites. Zero midtone color cast. Contrast: 50:1 in final. No grain - ultimate precision.",
        composition: "Perfect symmetry with product at mathematical center. Minimal negative space doctrine. Gold accent elements at 1/3 and 2/3 lines. Single-point focus, everything else falls to black. Circular spotlight creates natural vignette. Product floating creates aspirational 'untouchable' feel.",
        mood: "Exclusivo, misterioso, deseable",
        viral_hook: "Elegancia minimalista de alto contraste",
    },
];

pub static MUSIC_STYLES: &[MusicStyle] = &[
    MusicStyle {
        id: "jingle_comercial",
        name: "Jingle Comercial",
        description: "Música pegajosa para anuncios y comerciales",
        icon: "🎵",
        prompt_hint: "catchy commercial jingle",
    },
    MusicStyle {
        id: "latin_pop",
        name: "Latin Pop",
        description: "Pop latino con ritmos bailables",
        icon: "💃",
        prompt_hint: "latin pop upbeat",
    },
    MusicStyle {
        id: "reggaeton",
        name: "Reggaeton",
        description: "Ritmos urbanos latinos",
        icon: "🔥",
        prompt_hint: "reggaeton urban beat",
    },
    MusicStyle {
        id: "electronica",
        name: "Electrónica",
        description: "Música electrónica y EDM",
        icon: "⚡",
        prompt_hint: "electronic EDM energetic",
    },
    MusicStyle {
        id: "acustico",
        name: "Acústico",
        description: "Sonido orgánico con guitarra",
        icon: "🎸",
        prompt_hint: "acoustic guitar warm",
    },
    MusicStyle {
        id: "hip_hop",
        name: "Hip Hop",
        description: "Beats de hip hop y rap",
        icon: "🎤",
        prompt_hint: "hip hop rap beat",
    },
    MusicStyle {
        id: "cinematic",
        name: "Cinemático",
        description: "Música épica para videos",
        icon: "🎬",
        prompt_hint: "cinematic epic orchestral",
    },
    MusicStyle {
        id: "lofi",
        name: "Lo-Fi",
        description: "Chill beats relajantes",
        icon: "☕",
        prompt_hint: "lofi chill relaxed beats",
    },
];

pub static CREDIT_PACKAGES: &[CreditPackage] = &[
    CreditPackage {
        id: "pack_10",
        credits: 10,
        price_mxn_cents: 15_000,
        name: "10 Créditos",
        description: "Paquete básico - 10 generaciones",
        popular: false,
        best_value: false,
    },
    CreditPackage {
        id: "pack_25",
        credits: 25,
        price_mxn_cents: 35_000,
        name: "25 Créditos",
        description: "Paquete popular - 25 generaciones",
        popular: true,
        best_value: false,
    },
    CreditPackage {
        id: "pack_50",
        credits: 50,
        price_mxn_cents: 68_000,
        name: "50 Créditos",
        description: "Paquete profesional - 50 generaciones",
        popular: false,
        best_value: false,
    },
    CreditPackage {
        id: "pack_100",
        credits: 100,
        price_mxn_cents: 129_000,
        name: "100 Créditos",
        description: "Mejor valor - 100 generaciones",
        popular: false,
        best_value: true,
    },
];

pub fn visual_preset(id: &str) -> Option<&'static VisualPreset> {
    VISUAL_PRESETS.iter().find(|p| p.id == id)
}

/// Presets tagged with `category`; `None` or [`ALL_CATEGORIES`] returns all of them.
pub fn presets_in_category(category: Option<&str>) -> Vec<&'static VisualPreset> {
    match category {
        None | Some(ALL_CATEGORIES) => VISUAL_PRESETS.iter().collect(),
        Some(cat) => VISUAL_PRESETS
            .iter()
            .filter(|p| p.categories.contains(&cat))
            .collect(),
    }
}

pub fn music_style(id: &str) -> Option<&'static MusicStyle> {
    MUSIC_STYLES.iter().find(|s| s.id == id)
}

pub fn credit_package(id: &str) -> Option<&'static CreditPackage> {
    CREDIT_PACKAGES.iter().find(|p| p.id == id)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_preset_is_reachable_by_id() {
        assert_eq!(VISUAL_PRESETS.len(), 8);
        for preset in VISUAL_PRESETS {
            assert_eq!(visual_preset(preset.id).map(|p| p.id), Some(preset.id));
        }
        assert!(visual_preset("vaporwave").is_none());
    }

    #[test]
    fn category_filter() {
        assert_eq!(presets_in_category(None).len(), VISUAL_PRESETS.len());
        assert_eq!(presets_in_category(Some("todos")).len(), VISUAL_PRESETS.len());

        let hogar: Vec<_> = presets_in_category(Some("hogar")).iter().map(|p| p.id).collect();
        assert_eq!(hogar, vec!["botanical_luxury", "miniature_world"]);
        assert!(presets_in_category(Some("autos")).is_empty());
    }

    #[test]
    fn preset_categories_are_known() {
        for preset in VISUAL_PRESETS {
            for cat in preset.categories {
                assert!(CATEGORIES.iter().any(|c| c.id == *cat), "{cat}");
            }
        }
    }

    #[test]
    fn packages() {
        let pack = credit_package("pack_25").unwrap();
        assert_eq!(pack.credits, 25);
        assert_eq!(pack.price_mxn_cents, 35_000);
        assert!(pack.popular);
        assert!(credit_package("pack_7").is_none());
        assert_eq!(music_style("lofi").map(|s| s.prompt_hint), Some("lofi chill relaxed beats"));
    }
}
