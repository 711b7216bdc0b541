use crate::{
    config::GenerateConfig,
    database::{ConnectionError, Database},
    schema,
    table::{TestRow, TABLE},
};
use rand::{rngs::StdRng, seq::SliceRandom, Rng, SeedableRng};
use std::time::Instant;
use tracing::{debug, info, instrument};

const WORDS: [&str; 48] = [
    "anchor", "binder", "candle", "dynamo", "easel", "falcon", "garnet", "harbor", "island",
    "jigsaw", "kettle", "lantern", "magnet", "nectar", "oyster", "pepper", "quartz", "ribbon",
    "saddle", "timber", "umbrella", "velvet", "walnut", "yonder", "zephyr", "blanket", "compass",
    "drizzle", "ember", "fossil", "goblet", "hammock", "ivory", "juniper", "kiosk", "ledger",
    "meadow", "nutmeg", "orbit", "pillow", "quiver", "rocket", "sprout", "thimble", "utensil",
    "vortex", "whistle", "yarrow",
];

const CITIES: [&str; 40] = [
    "Springfield", "Riverside", "Franklin", "Greenville", "Bristol", "Clinton", "Fairview",
    "Salem", "Madison", "Georgetown", "Arlington", "Ashland", "Burlington", "Manchester",
    "Milton", "Newport", "Oxford", "Jackson", "Marion", "Dover", "Hudson", "Kingston",
    "Lexington", "Auburn", "Dayton", "Lebanon", "Chester", "Winchester", "Cleveland",
    "Hamilton", "Jamestown", "Lakewood", "Mount Vernon", "Oakland", "Portland", "Richmond",
    "Shelby", "Troy", "Union", "Waverly",
];

const STATES: [&str; 20] = [
    "Alabama", "Arizona", "California", "Colorado", "Florida", "Georgia", "Illinois", "Indiana",
    "Kentucky", "Maine", "Michigan", "Nevada", "New York", "Ohio", "Oregon", "Texas", "Utah",
    "Vermont", "Virginia", "Washington",
];

const FIRST_NAMES: [&str; 16] = [
    "James", "Mary", "Robert", "Patricia", "John", "Jennifer", "Michael", "Linda", "David",
    "Elizabeth", "William", "Barbara", "Richard", "Susan", "Joseph", "Jessica",
];

const LAST_NAMES: [&str; 16] = [
    "Smith", "Johnson", "Williams", "Brown", "Jones", "Garcia", "Miller", "Davis", "Rodriguez",
    "Martinez", "Hernandez", "Lopez", "Gonzalez", "Wilson", "Anderson", "Thomas",
];

const STREET_SUFFIXES: [&str; 6] = ["Street", "Avenue", "Road", "Lane", "Drive", "Court"];
const EMAIL_DOMAINS: [&str; 4] = ["example.com", "example.org", "example.net", "mail.test"];

const STATUSES: [&str; 4] = ["pending", "shipped", "delivered", "returned"];
const PLATFORMS: [&str; 3] = ["web", "mobile", "app"];
const DEVICE_TYPES: [&str; 3] = ["desktop", "tablet", "phone"];
const SHIPPING_METHODS: [&str; 3] = ["standard", "express", "overnight"];
const PAYMENT_METHODS: [&str; 3] = ["credit_card", "paypal", "cash"];
const GIFT_WRAP: [&str; 2] = ["yes", "no"];
const BROWSERS: [&str; 4] = ["Chrome", "Firefox", "Safari", "Edge"];
const OPERATING_SYSTEMS: [&str; 5] = ["Windows", "Linux", "macOS", "Android", "iOS"];
const USER_AGENTS: [&str; 4] = [
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/118.0 Safari/537.36",
    "Mozilla/5.0 (X11; Linux x86_64; rv:119.0) Gecko/20100101 Firefox/119.0",
    "Mozilla/5.0 (Macintosh; Intel Mac OS X 14_0) AppleWebKit/605.1.15 (KHTML, like Gecko) Version/17.0 Safari/605.1.15",
    "Mozilla/5.0 (iPhone; CPU iPhone OS 17_0 like Mac OS X) AppleWebKit/605.1.15 (KHTML, like Gecko) Mobile/15E148",
];
const TIMEZONES: [&str; 8] = [
    "America/New_York", "America/Chicago", "America/Denver", "America/Los_Angeles",
    "Europe/London", "Europe/Berlin", "Asia/Tokyo", "Australia/Sydney",
];
const MEMBERSHIP_LEVELS: [&str; 4] = ["Bronze", "Silver", "Gold", "Platinum"];
const OCCUPATIONS: [&str; 10] = [
    "Engineer", "Teacher", "Nurse", "Accountant", "Designer", "Electrician", "Chef",
    "Pharmacist", "Librarian", "Surveyor",
];
const EDUCATION_LEVELS: [&str; 4] = ["High School", "Bachelors", "Masters", "PhD"];
const INCOME_RANGES: [&str; 4] = ["<20K", "20K-50K", "50K-100K", ">100K"];
const MARITAL_STATUSES: [&str; 3] = ["Single", "Married", "Divorced"];
const LANGUAGES: [&str; 4] = ["English", "Spanish", "French", "Mandarin"];

// unix seconds, roughly 2020-09 to 2023-11
const DATE_RANGE: std::ops::RangeInclusive<i64> = 1_600_000_000..=1_700_000_000;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoadSummary {
    pub rows: u64,
    /// size of every bulk insert in order
    pub batches: Vec<usize>,
}

/// Seeded producer of synthetic orders, the same seed yields the same rows
#[derive(Debug)]
pub struct RowGenerator {
    rng: StdRng,
}

impl RowGenerator {
    pub fn new(seed: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
        }
    }

    fn pick(&mut self, values: &[&'static str]) -> &'static str {
        values.choose(&mut self.rng).copied().unwrap_or_default()
    }

    fn uniform(&mut self, low: f64, high: f64, digits: i32) -> f64 {
        round(self.rng.gen_range(low..high), digits)
    }

    /// `?` becomes an uppercase letter, `#` a digit
    fn pattern(&mut self, pattern: &str) -> String {
        pattern
            .chars()
            .map(|c| match c {
                '?' => char::from(self.rng.gen_range(b'A'..=b'Z')),
                '#' => char::from(self.rng.gen_range(b'0'..=b'9')),
                other => other,
            })
            .collect()
    }

    fn address(&mut self) -> String {
        format!(
            "{} {} {}, {}, {} {:05}",
            self.rng.gen_range(1..10_000),
            self.pick(&WORDS),
            self.pick(&STREET_SUFFIXES),
            self.pick(&CITIES),
            self.pick(&STATES),
            self.rng.gen_range(501..99_951)
        )
    }

    fn notes(&mut self) -> String {
        let mut notes = String::new();

        loop {
            let word = self.pick(&WORDS);
            if notes.len() + word.len() + 2 > 50 {
                break;
            }
            if !notes.is_empty() {
                notes.push(' ');
            }
            notes.push_str(word);
        }
        notes.push('.');

        notes
    }

    pub fn row(&mut self, order_id: i64) -> TestRow {
        let first_name = self.pick(&FIRST_NAMES);
        let last_name = self.pick(&LAST_NAMES);
        let email = format!(
            "{}.{}{}@{}",
            first_name.to_lowercase(),
            last_name.to_lowercase(),
            self.rng.gen_range(1..1000),
            self.pick(&EMAIL_DOMAINS)
        );

        TestRow {
            order_id,
            user_id: self.rng.gen_range(1..=10_000),
            product_id: self.rng.gen_range(1..=100_000),
            product_name: self.pick(&WORDS),
            category_id: self.rng.gen_range(1..=50),
            price: round(
                self.rng.gen_range(0..1000) as f64 + self.rng.gen::<f64>(),
                2,
            ),
            quantity: self.rng.gen_range(1..=10),
            discount: self.uniform(0.0, 0.3, 2),
            tax: self.uniform(0.0, 0.2, 2),
            status: self.pick(&STATUSES),
            order_date: self.rng.gen_range(DATE_RANGE),
            delivery_date: self.rng.gen_range(DATE_RANGE),
            city: self.pick(&CITIES),
            state: self.pick(&STATES),
            country_id: self.rng.gen_range(1..=200),
            email,
            phone: self.pattern("+1-###-###-####"),
            customer_name: format!("{first_name} {last_name}"),
            shipping_address: self.address(),
            billing_address: self.address(),
            rating: self.uniform(1.0, 5.0, 1),
            is_returned: self.rng.gen_bool(0.1),
            platform: self.pick(&PLATFORMS),
            device_type: self.pick(&DEVICE_TYPES),
            notes: self.notes(),
            coupon_code: self.pattern("???###"),
            shipping_method: self.pick(&SHIPPING_METHODS),
            payment_method: self.pick(&PAYMENT_METHODS),
            invoice_number: self.pattern("INV#######"),
            gift_wrap: self.pick(&GIFT_WRAP),
            warehouse_id: self.rng.gen_range(1..=50),
            batch_number: self.rng.gen_range(1..=100),
            supplier_id: self.rng.gen_range(1..=5000),
            shipment_id: self.rng.gen_range(1..=10_000),
            carrier_id: self.rng.gen_range(1..=300),
            tracking_number: self.pattern("TRK######"),
            browser: self.pick(&BROWSERS),
            os: self.pick(&OPERATING_SYSTEMS),
            os_version: self.rng.gen_range(1..=15),
            ip_address: format!(
                "{}.{}.{}.{}",
                self.rng.gen_range(1..=223u8),
                self.rng.gen::<u8>(),
                self.rng.gen::<u8>(),
                self.rng.gen_range(1..=254u8)
            ),
            user_agent: self.pick(&USER_AGENTS),
            latitude: self.uniform(-90.0, 90.0, 6),
            longitude: self.uniform(-180.0, 180.0, 6),
            timezone: self.pick(&TIMEZONES),
            campaign_name: self.pick(&WORDS),
            referral_source: self.pick(&WORDS),
            session_id: format!("{:08x}", self.rng.gen::<u32>()),
            page_views: self.rng.gen_range(1..=5000),
            clicks: self.rng.gen_range(1..=1000),
            impressions: self.rng.gen_range(1..=10_000),
            is_new_customer: self.rng.gen_bool(0.3),
            conversion_rate: self.uniform(0.0, 1.0, 3),
            avg_order_value: self.uniform(10.0, 1000.0, 2),
            lifetime_value: self.uniform(100.0, 10_000.0, 2),
            loyalty_points: self.rng.gen_range(0..=1000),
            membership_level: self.pick(&MEMBERSHIP_LEVELS),
            age: self.rng.gen_range(18..=75),
            occupation: self.pick(&OCCUPATIONS),
            education_level: self.pick(&EDUCATION_LEVELS),
            income_range: self.pick(&INCOME_RANGES),
            marital_status: self.pick(&MARITAL_STATUSES),
            preferred_language: self.pick(&LANGUAGES),
            custom_field_1: self.pick(&WORDS),
            custom_field_2: self.pick(&WORDS),
            custom_field_3: self.pick(&WORDS),
            custom_field_4: self.pick(&WORDS),
        }
    }
}

fn round(value: f64, digits: i32) -> f64 {
    let factor = 10f64.powi(digits);

    (value * factor).round() / factor
}

/// Replace the contents of the benchmark table with `config.total_rows` fresh rows.
///
/// Every batch is committed on its own; if an insert fails the rows of earlier batches stay in
/// the table and the error is returned.
#[instrument(skip(db, config), fields(backend = db.backend(), rows = config.total_rows))]
pub fn load<D: Database>(db: &mut D, config: &GenerateConfig) -> Result<LoadSummary, ConnectionError> {
    let start = Instant::now();
    let deleted = db.execute(&format!("delete from {TABLE}"))?;
    debug!(rows = deleted, "Cleared {TABLE}");

    info!("Generating and inserting data...");

    let mut generator = RowGenerator::new(config.seed);
    let mut summary = LoadSummary {
        rows: 0,
        batches: Vec::new(),
    };
    let batch_size = config.batch_size.max(1);
    let total_batches = config.total_rows.div_ceil(batch_size as u64);
    let mut buffer = Vec::with_capacity(batch_size);

    for order_id in 1..=config.total_rows {
        buffer.push(generator.row(order_id as i64));

        if buffer.len() == batch_size {
            flush(db, &mut buffer, &mut summary)?;
            info!("Inserted batch {}/{total_batches}", summary.batches.len());
        }
    }

    if !buffer.is_empty() {
        flush(db, &mut buffer, &mut summary)?;
        info!("Inserted batch {}/{total_batches}", summary.batches.len());
    }

    if let Some(refreshed) = schema::refresh_derived_column(db)? {
        info!(rows = refreshed, "Refreshed derived column");
    }
    let stored = db.query_scalar(&format!("select count(*) from {TABLE}"))?;

    info!(
        rows = summary.rows,
        stored,
        batches = summary.batches.len(),
        "Data generation and insertion completed in {:.2?}",
        start.elapsed()
    );

    Ok(summary)
}

fn flush<D: Database>(
    db: &mut D,
    buffer: &mut Vec<TestRow>,
    summary: &mut LoadSummary,
) -> Result<(), ConnectionError> {
    db.insert_rows(buffer)?;
    summary.rows += buffer.len() as u64;
    summary.batches.push(buffer.len());
    buffer.clear();

    Ok(())
}

#[cfg(test)]
#[path = "generate_test.rs"]
mod generate_test;
