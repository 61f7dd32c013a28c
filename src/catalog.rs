//! Static product catalog and the assistant persona built from it.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::fmt::Write;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum Category {
    Seeds,
    Fertilizers,
    CropProtection,
    Irrigation,
    Equipment,
}

impl Category {
    pub const ALL: [Category; 5] = [
        Category::Seeds,
        Category::Fertilizers,
        Category::CropProtection,
        Category::Irrigation,
        Category::Equipment,
    ];

    pub fn label(self) -> &'static str {
        match self {
            Category::Seeds => "Seeds",
            Category::Fertilizers => "Fertilizers",
            Category::CropProtection => "Crop Protection",
            Category::Irrigation => "Irrigation",
            Category::Equipment => "Equipment",
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct Product {
    pub name: &'static str,
    pub category: Category,
    pub description: &'static str,
    pub unit: &'static str,
}

pub const COMPANY_NAME: &str = "Greenfield Agro Supply";

pub const PRODUCTS: &[Product] = &[
    Product {
        name: "GF-418 Hybrid Maize",
        category: Category::Seeds,
        description: "Drought-tolerant yellow dent hybrid, 110-115 day maturity, strong stalks for mechanical harvest.",
        unit: "25 kg bag",
    },
    Product {
        name: "Sunrise Hard Red Wheat",
        category: Category::Seeds,
        description: "Winter wheat with high protein content and rust resistance, suited to loam and clay-loam soils.",
        unit: "50 kg bag",
    },
    Product {
        name: "Valley Gold Soybean",
        category: Category::Seeds,
        description: "Maturity group 3 soybean with good pod clearance and tolerance to iron-deficiency chlorosis.",
        unit: "140k seed unit",
    },
    Product {
        name: "Roma Supreme Tomato",
        category: Category::Seeds,
        description: "Determinate processing tomato, uniform ripening, resistant to fusarium and verticillium wilt.",
        unit: "5,000 seed pack",
    },
    Product {
        name: "NPK 15-15-15 Granular",
        category: Category::Fertilizers,
        description: "Balanced compound fertilizer for basal application on cereals and vegetables.",
        unit: "50 kg bag",
    },
    Product {
        name: "Urea 46% N",
        category: Category::Fertilizers,
        description: "Prilled urea for top dressing; incorporate or irrigate to limit volatilization losses.",
        unit: "50 kg bag",
    },
    Product {
        name: "GreenCompost Organic Blend",
        category: Category::Fertilizers,
        description: "Certified organic compost enriched with bone meal, improves soil structure and water holding.",
        unit: "1 tonne bulk bag",
    },
    Product {
        name: "CalMag Foliar Plus",
        category: Category::Fertilizers,
        description: "Liquid calcium and magnesium foliar feed that helps prevent blossom-end rot.",
        unit: "20 L drum",
    },
    Product {
        name: "ShieldGuard Fungicide",
        category: Category::CropProtection,
        description: "Broad-spectrum protectant against blights and leaf spots; follow label re-entry intervals.",
        unit: "5 L jerrycan",
    },
    Product {
        name: "BioNeem Insect Control",
        category: Category::CropProtection,
        description: "Neem-oil based insecticide approved for organic production, targets aphids and whitefly.",
        unit: "1 L bottle",
    },
    Product {
        name: "Selective Broadleaf Herbicide",
        category: Category::CropProtection,
        description: "Post-emergence control of broadleaf weeds in cereals; do not apply to broadleaf crops.",
        unit: "10 L jerrycan",
    },
    Product {
        name: "DripLine Pro 16 mm",
        category: Category::Irrigation,
        description: "Pressure-compensating drip tape with emitters every 30 cm, 2 L/h flow.",
        unit: "500 m roll",
    },
    Product {
        name: "Impact Sprinkler Kit",
        category: Category::Irrigation,
        description: "Brass impact sprinklers with risers and couplings covering up to 0.5 ha.",
        unit: "kit of 12",
    },
    Product {
        name: "Solar Pump 1.5 kW",
        category: Category::Irrigation,
        description: "Submersible solar pump with controller, lifts up to 80 m for off-grid wells.",
        unit: "each",
    },
    Product {
        name: "Knapsack Sprayer 16 L",
        category: Category::Equipment,
        description: "Manual piston sprayer with adjustable nozzle and padded straps.",
        unit: "each",
    },
    Product {
        name: "Two-Wheel Walking Tractor",
        category: Category::Equipment,
        description: "12 hp diesel walking tractor with rotary tiller attachment for smallholder plots.",
        unit: "each",
    },
    Product {
        name: "Soil Test Kit",
        category: Category::Equipment,
        description: "Field kit measuring pH, nitrogen, phosphorus and potassium; 50 tests per kit.",
        unit: "kit",
    },
];

const PERSONA: &str = "\
You are the virtual agronomy assistant for Greenfield Agro Supply, a family-run \
agricultural supply company serving growers from smallholders to large estates.

Tone: friendly, practical and concise. Speak like an experienced field agronomist \
who knows the products on the shelf.

Rules:
- Recommend only products from the catalog below, by their exact names.
- When a question depends on soil, climate or crop stage, ask one short follow-up question.
- Always remind users to read the label before applying any crop protection product.
- Do not quote prices; direct pricing and availability questions to the sales desk.
- If a question is outside agriculture or the catalog, say so politely and steer back.";

pub fn products_in(category: Option<Category>) -> Vec<&'static Product> {
    PRODUCTS
        .iter()
        .filter(|p| category.map_or(true, |c| p.category == c))
        .collect()
}

/// Persona plus the full catalog, grouped by category.
pub fn system_instruction() -> String {
    let mut out = String::from(PERSONA);
    out.push_str("\n\n# Product catalog\n");
    for category in Category::ALL {
        let _ = write!(out, "\n## {}\n", category.label());
        for p in products_in(Some(category)) {
            let _ = writeln!(out, "- {} ({}): {}", p.name, p.unit, p.description);
        }
    }
    out
}
