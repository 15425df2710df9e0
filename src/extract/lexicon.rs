// Word lists for the heuristic recognizer and relation patterns.
// All entries are lowercase.

/// Words preceding a person name
pub const PERSON_TITLES: &[&str] = &[
    "mr", "mrs", "ms", "miss", "dr", "prof", "professor", "sir", "madam", "dame", "lord", "lady",
    "president", "ceo", "senator", "judge", "captain",
];

/// Last (or first) word of an organization name
pub const ORG_SUFFIXES: &[&str] = &[
    "inc", "corp", "corporation", "co", "company", "ltd", "llc", "plc", "gmbh", "ag", "sa",
    "group", "holdings", "labs", "technologies", "systems", "university", "institute",
    "foundation", "association", "agency", "bank", "college", "school", "hospital", "ministry",
    "department", "council", "committee", "society", "studios", "partners", "ventures",
];

pub const ORG_KEYWORDS: &[&str] = &[
    "microsoft", "google", "alphabet", "apple", "amazon", "meta", "facebook", "netflix", "tesla",
    "openai", "anthropic", "deepmind", "nvidia", "intel", "amd", "ibm", "oracle", "salesforce",
    "adobe", "spotify", "uber", "airbnb", "twitter", "linkedin", "samsung", "sony", "toyota",
    "nasa", "nato", "unesco", "fbi", "cia", "mit", "stanford", "harvard", "oxford",
    "cambridge", "mozilla", "github", "gitlab", "stripe", "shopify", "cloudflare", "reddit",
    "wikipedia", "red cross", "world bank", "european union", "united nations",
];

pub const LOCATION_KEYWORDS: &[&str] = &[
    "africa", "asia", "europe", "america", "antarctica", "australia", "north america",
    "south america", "usa", "uk", "united states", "united kingdom", "canada", "mexico",
    "brazil", "argentina", "france", "germany", "spain", "italy", "portugal", "netherlands",
    "belgium", "switzerland", "austria", "sweden", "norway", "denmark", "finland", "poland",
    "ireland", "greece", "turkey", "russia", "ukraine", "china", "japan", "korea", "india",
    "pakistan", "indonesia", "vietnam", "thailand", "singapore", "egypt", "nigeria", "kenya",
    "israel", "iran", "new zealand", "london", "paris", "berlin", "madrid", "rome", "amsterdam",
    "vienna", "dublin", "moscow", "tokyo", "kyoto", "osaka", "beijing", "shanghai", "seoul",
    "mumbai", "delhi", "bangalore", "sydney", "melbourne", "toronto", "vancouver", "montreal",
    "new york", "los angeles", "san francisco", "seattle", "redmond", "boston", "chicago",
    "austin", "denver", "miami", "washington", "california", "texas", "florida", "silicon valley",
    "cairo", "lagos", "nairobi", "dubai",
];

/// Adjectives of nationality / group
pub const NORP_KEYWORDS: &[&str] = &[
    "american", "british", "canadian", "french", "german", "spanish", "italian", "chinese",
    "japanese", "korean", "indian", "russian", "european", "african", "asian", "christian",
    "muslim", "jewish", "buddhist", "hindu", "democrat", "republican",
];

/// Products and technologies, matched when capitalized
pub const PRODUCT_KEYWORDS: &[&str] = &[
    "rust", "python", "java", "javascript", "typescript", "go", "kotlin", "swift", "haskell",
    "react", "vue", "angular", "django", "flask", "rails", "node", "kubernetes", "docker",
    "linux", "windows", "macos", "android", "ios", "postgresql", "postgres", "mysql", "sqlite",
    "mongodb", "redis", "kafka", "graphql", "tensorflow", "pytorch", "chatgpt", "gpt-4",
    "claude", "gemini", "iphone", "excel", "slack", "notion", "figma", "aws", "azure",
];

/// Product keywords distinctive enough to match in lowercase too
pub const PRODUCT_LOWERCASE_OK: &[&str] = &[
    "python", "javascript", "typescript", "kubernetes", "docker", "postgresql", "mysql",
    "sqlite", "mongodb", "graphql", "tensorflow", "pytorch", "chatgpt", "linux",
];

/// Common given names; a capitalized run starting with one of these is a person
pub const GIVEN_NAMES: &[&str] = &[
    "alice", "bob", "carol", "charlie", "dave", "david", "eve", "frank", "grace", "heidi",
    "ivan", "judy", "mallory", "oscar", "peggy", "trent", "victor", "walter", "john", "jane",
    "james", "mary", "michael", "sarah", "robert", "linda", "william", "elizabeth", "richard",
    "susan", "joseph", "jessica", "thomas", "karen", "daniel", "nancy", "matthew", "lisa",
    "anthony", "emily", "mark", "anna", "paul", "laura", "steven", "emma", "andrew", "olivia",
    "peter", "sophia", "kevin", "maria", "brian", "julia", "george", "chris", "alex", "sam",
    "tom", "ben", "kate", "lucy", "jack", "harry", "hannah", "mohammed", "ahmed", "wei", "yuki",
    "hiroshi", "priya", "raj", "carlos", "juan", "luis", "pierre", "hans", "ingrid", "olga",
];

/// Lowercase words that may join a capitalized run ("Bank of America")
pub const NAME_CONNECTORS: &[&str] = &["of", "for", "de", "van", "von", "der", "la", "del"];

/// Capitalized words that are never entities on their own
pub const STOP_WORDS: &[&str] = &[
    "i", "i'm", "i've", "i'd", "i'll", "a", "an", "the", "this", "that", "these", "those",
    "it", "its", "it's", "he", "she", "we", "they", "you", "your", "my", "our", "their",
    "his", "her", "me", "us", "them", "what", "which", "who", "whom", "when", "where", "why",
    "how", "if", "then", "so", "but", "and", "or", "nor", "yet", "also", "just", "only",
    "hello", "hi", "hey", "thanks", "thank", "please", "sorry", "yes", "no", "ok", "okay",
    "sure", "well", "nice", "great", "good", "oh", "ah", "wow", "let", "let's", "here",
    "there", "now", "today", "tomorrow", "yesterday", "can", "could", "would", "should",
    "will", "shall", "may", "might", "must", "do", "does", "did", "is", "are", "was", "were",
    "be", "been", "have", "has", "had", "not", "all", "some", "any", "each", "every", "both",
    "many", "much", "more", "most", "other", "such", "first", "next", "last", "after",
    "before", "during", "while", "with", "without", "from", "into", "about", "for", "in", "on",
    "at", "to", "of", "by", "as", "monday", "tuesday", "wednesday", "thursday", "friday",
    "saturday", "sunday", "january", "february", "march", "april", "june", "july", "august",
    "september", "october", "november", "december", "note", "step", "example", "however",
    "therefore", "user", "assistant", "system",
];

/// Words dropped from between two spans before reading a predicate
pub const PREDICATE_FILLERS: &[&str] = &[
    "a", "an", "the", "also", "now", "still", "really", "currently", "recently", "often",
    "usually", "actually", "just", "already", "mostly",
];

/// Words that end a clause; a phrase containing one links nothing
pub const CLAUSE_BREAKERS: &[&str] = &[
    "and", "or", "but", "because", "although", "though", "while", "whereas", "which", "who",
    "that", "if", "unless", "since", "so", "then", "not", "never",
];

/// Verbs recognized without a suffix rule
pub const COMMON_VERBS: &[&str] = &[
    "is", "are", "was", "were", "be", "been", "has", "have", "had", "do", "does", "did",
    "work", "works", "worked", "working", "live", "lives", "lived", "join", "joined",
    "found", "founded", "lead", "leads", "led", "run", "runs", "ran", "own", "owns", "owned",
    "build", "builds", "built", "make", "makes", "made", "meet", "meets", "met", "know",
    "knows", "knew", "visit", "visits", "visited", "use", "uses", "used", "love", "loves",
    "like", "likes", "hate", "hates", "buy", "buys", "bought", "sell", "sells", "sold",
    "move", "moved", "moves", "study", "studies", "studied", "teach", "teaches", "taught",
    "manage", "manages", "managed", "acquire", "acquired", "acquires", "hire", "hired",
    "hires", "leave", "left", "leaves", "marry", "married", "write", "writes", "wrote",
    "create", "created", "creates", "develop", "developed", "develops", "support",
    "supports", "supported", "partner", "partnered", "invest", "invested", "invests",
    "born", "based", "located", "headquartered", "employed",
];

/// Role nouns that act as the head of a predicate ("is CEO of")
pub const RELATION_NOUNS: &[&str] = &[
    "part", "member", "ceo", "cto", "founder", "cofounder", "head", "director", "manager",
    "employee", "student", "owner", "partner", "author", "creator", "capital", "subsidiary",
];

/// Prepositions allowed to end a predicate phrase
pub const PREPOSITIONS: &[&str] = &[
    "at", "in", "on", "for", "with", "by", "from", "to", "of", "into", "under", "near",
    "about", "as",
];
