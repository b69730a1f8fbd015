//! Keyword lexicons shared by the built-in backends and the quality scorer
//!
//! Each lexicon holds English whole words (plural `s`/`es` accepted) and
//! Russian stems matched as prefixes. Tokens must be lowercased by the caller.

use crate::types::DescriptionType;

/// Word list plus stem list
#[derive(Debug, Clone, Copy)]
pub struct Lexicon {
    pub words: &'static [&'static str],
    pub stems: &'static [&'static str],
}

impl Lexicon {
    /// Whether a lowercased token belongs to this lexicon
    pub fn contains(&self, token: &str) -> bool {
        if self.words.iter().any(|w| *w == token) {
            return true;
        }
        let singulars = [token.strip_suffix('s'), token.strip_suffix("es")];
        if singulars
            .iter()
            .flatten()
            .any(|singular| self.words.iter().any(|w| w == singular))
        {
            return true;
        }
        self.matches_stem(token)
    }

    /// Prefix match against stems only
    pub fn matches_stem(&self, token: &str) -> bool {
        self.stems.iter().any(|stem| token.starts_with(stem))
    }

    /// Count tokens that belong to this lexicon
    pub fn hits<'a, I>(&self, tokens: I) -> usize
    where
        I: IntoIterator<Item = &'a str>,
    {
        tokens.into_iter().filter(|t| self.contains(t)).count()
    }
}

/// Lexicon for a description type
pub fn for_type(description_type: DescriptionType) -> &'static Lexicon {
    match description_type {
        DescriptionType::Location => &LOCATION,
        DescriptionType::Character => &CHARACTER,
        DescriptionType::Atmosphere => &ATMOSPHERE,
        DescriptionType::Object => &OBJECT,
    }
}

pub static LOCATION: Lexicon = Lexicon {
    words: &[
        "room", "hall", "castle", "forest", "wood", "woods", "city", "town", "village", "street",
        "road", "river", "lake", "sea", "ocean", "shore", "beach", "mountain", "hill", "valley",
        "field", "meadow", "garden", "house", "palace", "tower", "church", "temple", "cave",
        "bridge", "square", "market", "tavern", "inn", "kitchen", "chamber", "corridor",
        "courtyard", "library", "cellar", "attic", "harbor", "harbour", "port", "desert", "island",
        "cliff", "plain", "swamp", "marsh", "path", "gate", "landscape", "horizon", "estate",
        "manor", "cottage", "hut", "ruins", "fortress", "camp", "clearing", "grove", "staircase",
    ],
    stems: &[
        "комнат", "зал", "замк", "замок", "лес", "город", "деревн", "улиц", "дорог", "рек",
        "озер", "мор", "берег", "гор", "холм", "долин", "луг", "сад", "дом", "дворц", "дворец",
        "башн", "церк", "храм", "пещер", "мост", "площад", "рын", "трактир", "кухн", "коридор",
        "двор", "библиотек", "подвал", "чердак", "гаван", "пустын", "остров", "скал", "равнин",
        "болот", "троп", "ворот", "усадьб", "хижин", "развалин", "крепост", "поляна", "рощ",
        "лестниц",
    ],
};

pub static CHARACTER: Lexicon = Lexicon {
    words: &[
        "face", "eyes", "eye", "hair", "beard", "hands", "hand", "smile", "man", "woman", "girl",
        "boy", "wore", "dressed", "dress", "coat", "cloak", "figure", "stranger", "knight",
        "king", "queen", "lady", "lord", "soldier", "child", "shoulders", "lips", "voice", "skin",
        "cheeks", "brow", "gaze", "wrinkled", "slender", "features", "nose", "chin", "mustache",
        "moustache", "freckles", "tall", "stout", "hunched", "uniform", "gown", "boots", "hat",
    ],
    stems: &[
        "лиц", "глаз", "волос", "бород", "улыб", "мужчин", "женщин", "девушк", "девочк",
        "мальчик", "старик", "старух", "юнош", "одет", "плать", "плащ", "фигур", "незнаком",
        "рыцар", "корол", "солдат", "ребен", "плеч", "губ", "голос", "щек", "щёк", "взгляд",
        "морщин", "стройн", "черты", "нос", "подбород", "усы", "веснушк", "сутул", "мундир",
        "сапог", "шляп",
    ],
};

pub static ATMOSPHERE: Lexicon = Lexicon {
    words: &[
        "fog", "mist", "dark", "darkness", "gloom", "gloomy", "light", "shadow", "silence",
        "quiet", "cold", "warm", "wind", "rain", "storm", "snow", "sun", "sunlight", "moonlight",
        "moon", "night", "dusk", "dawn", "twilight", "smell", "scent", "air", "sky", "clouds",
        "cloud", "thunder", "haze", "eerie", "ominous", "calm", "damp", "chill", "frost", "heat",
        "glow", "stillness", "mood", "atmosphere", "weather", "breeze", "smoke",
    ],
    stems: &[
        "туман", "мгл", "темн", "тьм", "мрак", "мрачн", "свет", "тен", "тишин", "тих", "холод",
        "тепл", "ветер", "ветр", "дожд", "бур", "гроз", "снег", "солн", "лун", "ноч", "сумер",
        "рассвет", "закат", "запах", "аромат", "воздух", "неб", "облак", "гром", "дымк",
        "зловещ", "спокой", "сырост", "мороз", "жар", "сиян", "тишь", "погод", "ветерок", "дым",
    ],
};

pub static OBJECT: Lexicon = Lexicon {
    words: &[
        "sword", "table", "chair", "book", "candle", "lamp", "door", "chest", "box", "ring",
        "key", "mirror", "cup", "bottle", "bed", "carpet", "painting", "portrait", "clock",
        "letter", "map", "shield", "crown", "necklace", "statue", "fireplace", "throne", "desk",
        "bag", "knife", "staff", "barrel", "cart", "wagon", "ship", "boat", "carriage", "goblet",
        "lantern", "scroll", "amulet", "dagger", "bow", "armor", "armour", "helmet", "vase",
    ],
    stems: &[
        "меч", "стол", "стул", "книг", "свеч", "ламп", "двер", "сундук", "шкатулк", "кольц",
        "ключ", "зеркал", "чаш", "бутыл", "кроват", "ковер", "ковр", "картин", "портрет",
        "письм", "щит", "корон", "ожерел", "стату", "камин", "трон", "сумк", "нож", "посох",
        "бочк", "телег", "корабл", "лодк", "карет", "кубок", "фонар", "свиток", "амулет",
        "кинжал", "лук", "доспех", "шлем", "ваз",
    ],
};

/// Colours, sizes, textures and materials
pub static DESCRIPTIVE: Lexicon = Lexicon {
    words: &[
        "red", "crimson", "scarlet", "blue", "azure", "green", "emerald", "yellow", "golden",
        "gold", "silver", "black", "white", "grey", "gray", "brown", "purple", "violet", "pale",
        "huge", "vast", "tiny", "small", "large", "enormous", "narrow", "wide", "ancient", "old",
        "rough", "smooth", "soft", "bright", "dim", "glittering", "shining", "heavy", "thick",
        "thin", "massive", "carved", "ornate", "polished", "rusty", "worn", "faded", "wooden",
        "stone", "marble", "iron", "velvet", "silk", "crumbling", "towering", "gleaming",
    ],
    stems: &[
        "красн", "алы", "багров", "синий", "синя", "синее", "голуб", "зелен", "зелён", "желт",
        "жёлт", "золот", "серебр", "черн", "чёрн", "белы", "бела", "белое", "серы", "сера",
        "серое", "коричн", "фиолет", "бледн", "огромн", "громадн", "крошечн", "маленьк",
        "больш", "узк", "широк", "древн", "стар", "груб", "гладк", "мягк", "ярк", "тускл",
        "блест", "тяжел", "тяжёл", "толст", "тонк", "массивн", "резн", "деревян",
        "камен", "мрамор", "желез", "бархат", "шелк", "шёлк",
    ],
};

/// Emotionally loaded vocabulary
pub static EMOTION: Lexicon = Lexicon {
    words: &[
        "fear", "afraid", "terror", "horror", "joy", "happy", "sad", "sorrow", "grief", "anger",
        "angry", "rage", "love", "hate", "dread", "anxious", "hope", "despair", "lonely", "tender",
        "gentle", "fierce", "wild", "terrible", "beautiful", "wonderful", "awful", "strange",
        "mysterious", "haunting", "melancholy", "serene", "menacing", "joyful", "sinister",
        "peaceful", "frightening", "longing",
    ],
    stems: &[
        "страх", "ужас", "радост", "счаст", "печал", "грус", "горест", "гнев", "злост", "ярост",
        "любов", "ненавис", "тревог", "надежд", "отчаян", "одинок", "нежн", "ласков", "свиреп",
        "дик", "страшн", "прекрасн", "чудесн", "стран", "таинствен", "зловещ", "безмятеж",
        "тоск",
    ],
};

/// Comparison and simile markers
pub static FIGURATIVE: Lexicon = Lexicon {
    words: &["like", "resembling", "seemed", "словно", "будто", "точно", "подобно", "казалось"],
    stems: &[],
};

/// Spatial prepositions introducing a place phrase
pub static SPATIAL_PREPOSITIONS: Lexicon = Lexicon {
    words: &[
        "in", "inside", "into", "at", "on", "under", "beneath", "above", "over", "near",
        "behind", "across", "through", "along", "beyond", "within", "around", "toward", "towards",
        "в", "во", "на", "под", "над", "у", "за", "возле", "около", "вдоль", "сквозь", "через",
        "среди", "внутри",
    ],
    stems: &[],
};

/// Determiners and possessives that open a noun phrase
pub static DETERMINERS: Lexicon = Lexicon {
    words: &[
        "the", "a", "an", "this", "that", "his", "her", "their", "its", "our", "my", "every",
        "some", "этот", "эта", "это", "тот", "та", "его", "её", "ее", "их", "наш", "мой",
    ],
    stems: &[],
};

/// Verbs describing appearance, posture or clothing
pub static APPEARANCE_VERBS: Lexicon = Lexicon {
    words: &[
        "wore", "wearing", "dressed", "had", "looked", "seemed", "appeared", "stood", "sat",
        "was", "were", "carried", "носил", "носила", "выглядел", "выглядела", "стоял", "стояла",
        "сидел", "сидела", "был", "была", "держал", "держала",
    ],
    stems: &["одет"],
};

/// Personal pronouns and forms of address acting as sentence subjects
pub static SUBJECTS: Lexicon = Lexicon {
    words: &[
        "he", "she", "they", "his", "her", "him", "man", "woman", "girl", "boy", "stranger",
        "он", "она", "они", "его", "её", "ее",
    ],
    stems: &[],
};
