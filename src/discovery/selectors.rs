//! Selector catalogues driving the discovery sweeps. Pure data.

/// Landmarks tried in order to scope discovery to the main content region.
pub const MAIN_CONTENT_SELECTORS: &[&str] = &[
    "main",
    "[role=\"main\"]",
    "#main",
    "#content",
    "#main-content",
    ".main-content",
    ".content",
    ".page-content",
    ".site-content",
];

/// Tags that are header/footer chrome outright.
pub const HEADER_FOOTER_TAGS: &[&str] = &["header", "nav", "footer"];

/// Keywords marking an element (or ancestor) as header/footer chrome when
/// present in its class list or id.
pub const HEADER_FOOTER_KEYWORDS: &[&str] = &[
    "header",
    "nav",
    "navigation",
    "navbar",
    "nav-bar",
    "footer",
    "site-header",
    "site-footer",
    "page-header",
    "page-footer",
    "main-header",
    "main-footer",
    "top-nav",
    "bottom-nav",
    "primary-nav",
    "secondary-nav",
    "breadcrumb",
];

/// ARIA landmark roles excluded as page chrome.
pub const HEADER_FOOTER_ROLES: &[&str] = &["banner", "navigation", "contentinfo"];

/// Containers that plausibly hold an auto-rotating carousel or banner.
pub const CAROUSEL_CONTAINER_SELECTORS: &[&str] = &[
    ".carousel",
    ".slider",
    ".banner-slider",
    ".swiper",
    ".slick",
    "[data-ride=\"carousel\"]",
    ".owl-carousel",
    ".hero-banner",
    ".banner-container",
    ".slideshow",
    ".image-slider",
    ".swiper-container",
    ".swiper-wrapper",
    ".glide",
    ".splide",
    ".flickity",
    ".keen-slider",
    ".embla",
    ".tiny-slider",
    "[data-carousel]",
    "[data-slider]",
    "[data-swiper]",
    ".slide-container",
    ".carousel-container",
    ".slider-wrapper",
    ".hero-slider",
    ".product-slider",
    ".testimonial-slider",
    ".gallery-slider",
    ".content-slider",
    ".banner-carousel",
    ".thumbnail__overlay",
];

/// Class keywords used to recognize that an element already sits inside a
/// processed carousel container.
pub const CAROUSEL_CLASS_KEYWORDS: &[&str] = &[
    "carousel",
    "slider",
    "banner-slider",
    "swiper",
    "slick",
    "owl-carousel",
    "hero-banner",
    "banner-container",
    "slideshow",
];

/// Slide children, tried in order; the first selector with matches wins.
pub const SLIDE_SELECTORS: &[&str] = &[
    ".carousel-item",
    ".slide",
    ".slider-item",
    ".swiper-slide",
    ".slick-slide",
    ".banner-slide",
    ".owl-item",
    "[data-slide]",
    ".glide__slide",
    ".splide__slide",
    ".flickity-cell",
    ".keen-slider__slide",
    ".embla__slide",
    ".tns-item",
    ".carousel-cell",
    ".slider-slide",
    ".slide-item",
    "[class*=\"slide\"]",
    "[data-slide-index]",
    "[data-slide-id]",
];

/// Nested wrappers scanned when no slide selector matches directly.
pub const SLIDE_WRAPPER_SELECTORS: &[&str] = &[
    ".swiper-wrapper",
    ".slider-wrapper",
    ".carousel-inner",
    ".slides",
];

/// Class keywords satisfying the slide-likeness predicate.
pub const SLIDE_CLASS_KEYWORDS: &[&str] = &["slide", "item", "cell", "panel", "tab"];

/// Clickable candidates inside a normalized slide.
pub const SLIDE_CLICKABLE_SELECTORS: &[&str] = &[
    "a",
    "button",
    "[onclick]",
    "[role=\"button\"]",
    "input[type=\"button\"]",
    "input[type=\"submit\"]",
    ".btn",
    ".button",
    ".link",
    ".cta",
    ".call-to-action",
    "[data-action]",
    "[data-click]",
    "[data-href]",
    ".carousel-control",
    ".slider-nav",
    ".slide-nav",
    ".prev",
    ".next",
    ".slide-btn",
    ".carousel-btn",
];

/// Uppercase action words; a slide descendant whose text contains one
/// (case-insensitively) is collected even when no selector matched it.
pub const ACTION_WORDS: &[&str] = &[
    "WATCH VIDEO",
    "PLAY",
    "SUBMIT",
    "APPLY",
    "START",
    "LEARN MORE",
    "READ MORE",
    "VIEW",
    "SEE MORE",
    "CLICK HERE",
    "DOWNLOAD",
    "UPLOAD",
    "NEXT",
    "PREV",
    "PREVIOUS",
];

/// The structural sweep catalogue: everything that plausibly responds to a
/// click, from anchors through ARIA roles to class-name heuristics.
pub const CLICKABLE_SELECTORS: &[&str] = &[
    // Basic clickable elements
    "a",
    "button",
    "input[type=\"button\"]",
    "input[type=\"submit\"]",
    "input[type=\"reset\"]",
    // Elements with interactive attributes
    "[onclick]",
    "[onmousedown]",
    "[onmouseup]",
    "[ondblclick]",
    // ARIA roles
    "[role=\"button\"]",
    "[role=\"link\"]",
    "[role=\"tab\"]",
    "[role=\"menuitem\"]",
    "[role=\"option\"]",
    "[role=\"treeitem\"]",
    "[role=\"gridcell\"]",
    // Focusable elements (potential clickables)
    "[tabindex=\"0\"]",
    "[tabindex=\"-1\"]",
    "div[tabindex]",
    "span[tabindex]",
    "li[tabindex]",
    "td[tabindex]",
    "th[tabindex]",
    // Common clickable classes and patterns
    ".btn",
    ".button",
    ".link",
    ".clickable",
    ".click",
    ".cta",
    ".call-to-action",
    ".action",
    ".trigger",
    ".menu-item",
    ".nav-item",
    ".tab",
    ".accordion",
    ".dropdown",
    ".select",
    ".picker",
    ".toggle",
    ".card",
    ".tile",
    ".item",
    ".option",
    ".close",
    ".cancel",
    ".submit",
    ".save",
    ".edit",
    ".delete",
    ".expand",
    ".collapse",
    ".show",
    ".hide",
    ".play",
    ".pause",
    ".stop",
    ".next",
    ".prev",
    ".previous",
    ".like",
    ".share",
    ".favorite",
    ".bookmark",
    ".download",
    ".upload",
    ".search",
    ".filter",
    ".sort",
    // Data attributes (modern web patterns)
    "[data-action]",
    "[data-click]",
    "[data-href]",
    "[data-url]",
    "[data-toggle]",
    "[data-target]",
    "[data-dismiss]",
    "[data-testid*=\"button\"]",
    "[data-testid*=\"link\"]",
    "[data-testid*=\"click\"]",
    "[data-cy*=\"button\"]",
    "[data-cy*=\"link\"]",
    "[data-cy*=\"click\"]",
    // Form controls that might be styled as buttons
    "select",
    "input[type=\"checkbox\"]",
    "input[type=\"radio\"]",
    "input[type=\"file\"]",
    "input[type=\"image\"]",
    // Modern web components and custom elements
    "[class*=\"btn\"]",
    "[class*=\"button\"]",
    "[class*=\"link\"]",
    "[class*=\"click\"]",
    "[class*=\"action\"]",
    "[class*=\"cta\"]",
    "[id*=\"btn\"]",
    "[id*=\"button\"]",
    "[id*=\"link\"]",
    // Media controls
    "video[controls]",
    "audio[controls]",
    // Interactive list items and table cells
    "li[onclick]",
    "td[onclick]",
    "tr[onclick]",
    "li[role=\"button\"]",
    "td[role=\"button\"]",
    "tr[role=\"button\"]",
    // SVG elements that might be clickable
    "svg[onclick]",
    "svg[role=\"button\"]",
    // Image maps and clickable images
    "area",
    "img[onclick]",
    "img[role=\"button\"]",
    // Custom interactive elements
    "div[role=\"button\"]",
    "span[role=\"button\"]",
    "p[role=\"button\"]",
    "section[role=\"button\"]",
    // Thumbnail overlay specifically
    ".thumbnail__overlay",
];

/// Transient overlay probes checked after a click with no navigation.
pub const OVERLAY_SELECTORS: &[&str] = &[
    ".modal",
    ".popup",
    ".overlay",
    ".dialog",
    "[role=\"dialog\"]",
    "[role=\"alertdialog\"]",
];

/// Expanded dropdown/menu probes, same purpose as [`OVERLAY_SELECTORS`].
pub const DROPDOWN_SELECTORS: &[&str] =
    &[".dropdown-menu", ".menu-open", "[aria-expanded=\"true\"]"];
